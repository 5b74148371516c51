//! Aggregated tabulation results.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::domain::{Edge, Fact, Finding, Reason, Stmt, Vertex};

/// Append-only aggregate of everything a runner derived: edges grouped by
/// their end vertex, facts reachable per statement, every reason each edge
/// was derived for (multiple reasons per edge are expected), and findings.
#[derive(Debug, Clone)]
pub struct IfdsComputationData<S, F, Fi>
where
    S: Stmt,
    F: Fact,
{
    pub edges_by_end: FxHashMap<Vertex<S, F>, FxHashSet<Edge<S, F>>>,
    pub facts_by_stmt: FxHashMap<S, FxHashSet<F>>,
    pub reasons_by_edge: FxHashMap<Edge<S, F>, FxHashSet<Reason<S, F>>>,
    pub findings: Vec<Fi>,
}

impl<S: Stmt, F: Fact, Fi> Default for IfdsComputationData<S, F, Fi> {
    fn default() -> Self {
        IfdsComputationData {
            edges_by_end: FxHashMap::default(),
            facts_by_stmt: FxHashMap::default(),
            reasons_by_edge: FxHashMap::default(),
            findings: Vec::new(),
        }
    }
}

impl<S: Stmt, F: Fact, Fi: Finding> IfdsComputationData<S, F, Fi> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set-union merge of another chunk's data into this one. Findings
    /// concatenate: where duplication matters they are already keyed by
    /// sink vertex.
    pub fn merge_from(&mut self, other: IfdsComputationData<S, F, Fi>) {
        for (vertex, edges) in other.edges_by_end {
            self.edges_by_end.entry(vertex).or_default().extend(edges);
        }
        for (stmt, facts) in other.facts_by_stmt {
            self.facts_by_stmt.entry(stmt).or_default().extend(facts);
        }
        for (edge, reasons) in other.reasons_by_edge {
            self.reasons_by_edge.entry(edge).or_default().extend(reasons);
        }
        self.findings.extend(other.findings);
    }

    /// All facts recorded at `stmt`.
    pub fn facts_at(&self, stmt: &S) -> impl Iterator<Item = &F> {
        self.facts_by_stmt.get(stmt).into_iter().flatten()
    }
}

/// Merge per-chunk results into one global table.
pub fn merge_computation_data<S, F, Fi, I>(parts: I) -> IfdsComputationData<S, F, Fi>
where
    S: Stmt,
    F: Fact,
    Fi: Finding,
    I: IntoIterator<Item = IfdsComputationData<S, F, Fi>>,
{
    let mut merged = IfdsComputationData::new();
    for part in parts {
        merged.merge_from(part);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vertex(stmt: u32, fact: &'static str) -> Vertex<u32, &'static str> {
        Vertex::new(stmt, fact)
    }

    fn edge(from: (u32, &'static str), to: (u32, &'static str)) -> Edge<u32, &'static str> {
        Edge::new(vertex(from.0, from.1), vertex(to.0, to.1))
    }

    #[test]
    fn merge_unions_keyed_collections() {
        let mut a: IfdsComputationData<u32, &'static str, String> = IfdsComputationData::new();
        let e1 = edge((1, "z"), (2, "t"));
        a.edges_by_end
            .entry(e1.to.clone())
            .or_default()
            .insert(e1.clone());
        a.reasons_by_edge
            .entry(e1.clone())
            .or_default()
            .insert(Reason::Initial);
        a.findings.push("one".to_string());

        let mut b: IfdsComputationData<u32, &'static str, String> = IfdsComputationData::new();
        b.edges_by_end
            .entry(e1.to.clone())
            .or_default()
            .insert(e1.clone());
        b.reasons_by_edge
            .entry(e1.clone())
            .or_default()
            .insert(Reason::Sequent { edge: e1.clone() });
        b.findings.push("two".to_string());

        let merged = merge_computation_data(vec![a, b]);
        assert_eq!(merged.edges_by_end[&e1.to].len(), 1);
        assert_eq!(merged.reasons_by_edge[&e1].len(), 2);
        assert_eq!(merged.findings.len(), 2);
    }

    fn part_from(raw: &[(u8, u8, u8, u8)]) -> IfdsComputationData<u32, &'static str, String> {
        const FACTS: [&str; 3] = ["z", "t", "u"];
        let mut data = IfdsComputationData::new();
        for &(from_stmt, from_fact, to_stmt, to_fact) in raw {
            let e = edge(
                (u32::from(from_stmt), FACTS[usize::from(from_fact) % 3]),
                (u32::from(to_stmt), FACTS[usize::from(to_fact) % 3]),
            );
            data.edges_by_end
                .entry(e.to.clone())
                .or_default()
                .insert(e.clone());
            data.facts_by_stmt
                .entry(e.to.stmt)
                .or_default()
                .insert(e.to.fact);
            data.reasons_by_edge.entry(e).or_default().insert(Reason::Initial);
        }
        data
    }

    proptest! {
        /// Merging the same chunk twice yields what merging it once does,
        /// and merge order never shows in the keyed collections.
        #[test]
        fn merge_is_idempotent_and_order_independent(
            first in proptest::collection::vec(any::<(u8, u8, u8, u8)>(), 0..40),
            second in proptest::collection::vec(any::<(u8, u8, u8, u8)>(), 0..40),
        ) {
            let once = merge_computation_data(vec![part_from(&first), part_from(&second)]);

            let twice = merge_computation_data(vec![
                part_from(&first),
                part_from(&second),
                part_from(&second),
            ]);
            prop_assert_eq!(&once.edges_by_end, &twice.edges_by_end);
            prop_assert_eq!(&once.facts_by_stmt, &twice.facts_by_stmt);
            prop_assert_eq!(&once.reasons_by_edge, &twice.reasons_by_edge);

            let swapped = merge_computation_data(vec![part_from(&second), part_from(&first)]);
            prop_assert_eq!(&once.edges_by_end, &swapped.edges_by_end);
            prop_assert_eq!(&once.facts_by_stmt, &swapped.facts_by_stmt);
            prop_assert_eq!(&once.reasons_by_edge, &swapped.reasons_by_edge);
        }
    }
}
