//! Trace reconstruction: walk recorded reasons backwards from a sink and
//! materialize a source-to-sink graph.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::domain::{Edge, Fact, Finding, Reason, Stmt, Vertex};
use crate::errors::{EngineError, Result};
use crate::result::IfdsComputationData;

/// Directed graph of vertices that lie on some derivation of `sink`,
/// oriented source-to-sink.
#[derive(Debug, Clone)]
pub struct TraceGraph<S, F> {
    pub sink: Vertex<S, F>,
    pub sources: FxHashSet<Vertex<S, F>>,
    pub edges: FxHashMap<Vertex<S, F>, FxHashSet<Vertex<S, F>>>,
}

impl<S: Stmt, F: Fact> TraceGraph<S, F> {
    fn neighbors(&self, vertex: &Vertex<S, F>) -> Vec<Vertex<S, F>> {
        self.edges
            .get(vertex)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Lazily enumerate every simple path from a source to the sink.
    /// Vertices never repeat within one path, so cyclic derivations still
    /// yield finitely many traces.
    pub fn all_traces(&self) -> AllTraces<'_, S, F> {
        AllTraces {
            graph: self,
            sources: self.sources.iter().cloned().collect::<Vec<_>>().into_iter(),
            frames: Vec::new(),
            path: Vec::new(),
        }
    }
}

/// Iterator over simple source-to-sink paths. Depth-first with explicit
/// frames, one frame per vertex on the current path.
pub struct AllTraces<'a, S, F> {
    graph: &'a TraceGraph<S, F>,
    sources: std::vec::IntoIter<Vertex<S, F>>,
    frames: Vec<(Vec<Vertex<S, F>>, usize)>,
    path: Vec<Vertex<S, F>>,
}

impl<S: Stmt, F: Fact> Iterator for AllTraces<'_, S, F> {
    type Item = Vec<Vertex<S, F>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.path.is_empty() {
                let source = self.sources.next()?;
                self.path.push(source.clone());
                if source == self.graph.sink {
                    let trace = self.path.clone();
                    self.path.clear();
                    return Some(trace);
                }
                self.frames.push((self.graph.neighbors(&source), 0));
                continue;
            }

            let Some((neighbors, index)) = self.frames.last_mut() else {
                self.path.clear();
                continue;
            };
            if *index >= neighbors.len() {
                self.frames.pop();
                self.path.pop();
                continue;
            }
            let next = neighbors[*index].clone();
            *index += 1;
            if self.path.contains(&next) {
                continue;
            }
            self.path.push(next.clone());
            if next == self.graph.sink {
                let trace = self.path.clone();
                self.path.pop();
                return Some(trace);
            }
            self.frames.push((self.graph.neighbors(&next), 0));
        }
    }
}

struct TraceState<S, F> {
    sink: Vertex<S, F>,
    sources: FxHashSet<Vertex<S, F>>,
    edges: FxHashMap<Vertex<S, F>, FxHashSet<Vertex<S, F>>>,
    visited: FxHashSet<(Edge<S, F>, Vertex<S, F>)>,
}

impl<S: Stmt, F: Fact> TraceState<S, F> {
    fn add_edge(&mut self, from: Vertex<S, F>, to: Vertex<S, F>) {
        if from != to {
            self.edges.entry(from).or_default().insert(to);
        }
    }
}

/// Walk one path edge backwards through its recorded reasons.
///
/// `last_vertex` is the vertex the current derivation step must connect
/// to; `stop_at_method_start` bounds the walk inside a callee when
/// expanding a summary edge.
fn dfs<S: Stmt, F: Fact, Fi: Finding>(
    data: &IfdsComputationData<S, F, Fi>,
    zero: Option<&F>,
    state: &mut TraceState<S, F>,
    edge: &Edge<S, F>,
    last_vertex: Vertex<S, F>,
    stop_at_method_start: bool,
) -> Result<()> {
    if !state
        .visited
        .insert((edge.clone(), last_vertex.clone()))
    {
        return Ok(());
    }

    // A self edge marks the method start.
    if stop_at_method_start && edge.is_start_marker() {
        state.add_edge(edge.from.clone(), last_vertex);
        return Ok(());
    }

    let vertex = &edge.to;
    if zero.is_some_and(|z| vertex.fact == *z) {
        state.add_edge(vertex.clone(), last_vertex);
        state.sources.insert(vertex.clone());
        return Ok(());
    }

    let Some(reasons) = data.reasons_by_edge.get(edge) else {
        return Ok(());
    };
    for reason in reasons {
        match reason {
            Reason::Initial => {
                state.sources.insert(vertex.clone());
                state.add_edge(vertex.clone(), last_vertex.clone());
            }
            Reason::Sequent { edge: pred_edge } | Reason::CallToReturn { edge: pred_edge } => {
                if pred_edge.to.fact == vertex.fact {
                    dfs(data, zero, state, pred_edge, last_vertex.clone(), stop_at_method_start)?;
                } else {
                    state.add_edge(pred_edge.to.clone(), last_vertex.clone());
                    dfs(
                        data,
                        zero,
                        state,
                        pred_edge,
                        pred_edge.to.clone(),
                        stop_at_method_start,
                    )?;
                }
            }
            Reason::CallToStart { caller_edge } => {
                if !stop_at_method_start {
                    state.add_edge(caller_edge.to.clone(), last_vertex.clone());
                    dfs(data, zero, state, caller_edge, caller_edge.to.clone(), false)?;
                }
            }
            Reason::ExitToReturnSite {
                summary_edge,
                caller_edge,
            } => {
                state.add_edge(summary_edge.from.clone(), last_vertex.clone());
                state.add_edge(caller_edge.to.clone(), summary_edge.from.clone());
                dfs(data, zero, state, summary_edge, summary_edge.to.clone(), true)?;
                dfs(
                    data,
                    zero,
                    state,
                    caller_edge,
                    caller_edge.to.clone(),
                    stop_at_method_start,
                )?;
            }
            Reason::FromOtherRunner { other, .. } => {
                return Err(EngineError::UnsupportedTrace(format!(
                    "edge injected by runner '{other}' cannot be expanded"
                )));
            }
        }
    }
    Ok(())
}

impl<S: Stmt, F: Fact, Fi: Finding> IfdsComputationData<S, F, Fi> {
    /// Build the trace graph for `sink`.
    ///
    /// `zero` is the analysis' neutral fact, if any: reaching it ends the
    /// backward walk and marks the spot as a source. Fails when a
    /// derivation crosses a runner boundary.
    pub fn build_trace_graph(
        &self,
        sink: Vertex<S, F>,
        zero: Option<&F>,
    ) -> Result<TraceGraph<S, F>> {
        let mut state = TraceState {
            sink: sink.clone(),
            sources: FxHashSet::default(),
            edges: FxHashMap::default(),
            visited: FxHashSet::default(),
        };
        if let Some(edges) = self.edges_by_end.get(&sink) {
            for edge in edges {
                dfs(self, zero, &mut state, edge, edge.to.clone(), false)?;
            }
        }
        Ok(TraceGraph {
            sink: state.sink,
            sources: state.sources,
            edges: state.edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunnerId;

    type V = Vertex<u32, &'static str>;

    fn v(stmt: u32, fact: &'static str) -> V {
        Vertex::new(stmt, fact)
    }

    fn e(from: V, to: V) -> Edge<u32, &'static str> {
        Edge::new(from, to)
    }

    fn data_with(
        entries: Vec<(Edge<u32, &'static str>, Reason<u32, &'static str>)>,
    ) -> IfdsComputationData<u32, &'static str, String> {
        let mut data = IfdsComputationData::new();
        for (edge, reason) in entries {
            data.edges_by_end
                .entry(edge.to.clone())
                .or_default()
                .insert(edge.clone());
            data.reasons_by_edge.entry(edge).or_default().insert(reason);
        }
        data
    }

    #[test]
    fn straight_line_trace_reaches_zero_source() {
        // zero at 1 generates "t" at 2, which flows to 3 (the sink).
        let seed = e(v(1, "z"), v(1, "z"));
        let gen = e(v(1, "z"), v(2, "t"));
        let flow = e(v(1, "z"), v(3, "t"));
        let data = data_with(vec![
            (seed.clone(), Reason::Initial),
            (gen.clone(), Reason::Sequent { edge: seed }),
            (flow.clone(), Reason::Sequent { edge: gen }),
        ]);

        let graph = data
            .build_trace_graph(v(3, "t"), Some(&"z"))
            .unwrap();
        assert!(graph.sources.contains(&v(1, "z")));
        // Same-fact hops are compressed: the walk carries the sink vertex
        // through 2 and connects the source to it directly.
        let traces: Vec<_> = graph.all_traces().collect();
        assert_eq!(traces, vec![vec![v(1, "z"), v(3, "t")]]);
    }

    #[test]
    fn cyclic_derivations_terminate_without_repeats() {
        // 2 and 3 derive each other (a loop); the sink is at 4.
        let seed = e(v(1, "z"), v(1, "z"));
        let a = e(v(1, "z"), v(2, "t"));
        let b = e(v(1, "z"), v(3, "t"));
        let sink_edge = e(v(1, "z"), v(4, "t"));
        let mut data = data_with(vec![
            (seed.clone(), Reason::Initial),
            (a.clone(), Reason::Sequent { edge: seed }),
            (sink_edge.clone(), Reason::Sequent { edge: b.clone() }),
        ]);
        data.reasons_by_edge
            .entry(a.clone())
            .or_default()
            .insert(Reason::Sequent { edge: b.clone() });
        data.reasons_by_edge
            .entry(b)
            .or_default()
            .insert(Reason::Sequent { edge: a });

        let graph = data
            .build_trace_graph(v(4, "t"), Some(&"z"))
            .unwrap();
        for trace in graph.all_traces() {
            let mut seen = FxHashSet::default();
            assert!(trace.iter().all(|vertex| seen.insert(vertex.clone())));
            assert_eq!(trace.last(), Some(&v(4, "t")));
        }
    }

    #[test]
    fn foreign_edges_are_not_expandable() {
        let injected = e(v(1, "t"), v(2, "t"));
        let data = data_with(vec![(
            injected.clone(),
            Reason::FromOtherRunner {
                edge: injected,
                other: RunnerId::new("backward"),
            },
        )]);

        let result = data.build_trace_graph(v(2, "t"), None);
        assert!(matches!(result, Err(EngineError::UnsupportedTrace(_))));
    }

    #[test]
    fn sink_equal_to_source_yields_single_vertex_trace() {
        let seed = e(v(1, "z"), v(1, "z"));
        let data = data_with(vec![(seed, Reason::Initial)]);
        let graph = data.build_trace_graph(v(1, "z"), None).unwrap();
        let traces: Vec<_> = graph.all_traces().collect();
        assert_eq!(traces, vec![vec![v(1, "z")]]);
    }
}
