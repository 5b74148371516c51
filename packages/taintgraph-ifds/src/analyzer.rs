//! Analyzer contract: flow functions plus edge-level event hooks.

use crate::domain::{Edge, RunnerId};

/// The four IFDS flow functions.
///
/// Each returns the (possibly empty) set of facts holding at the target
/// statement; returning an empty set kills the fact. Flow functions are
/// pure: no actor state is visible to them.
pub trait FlowFunctions<M, S, F>: Send + Sync {
    /// Straight-line flow from `current` to its successor `next`.
    fn sequent(&self, current: &S, next: &S, fact: &F) -> Vec<F>;

    /// Skip over a call site to its return site (caller-local facts).
    fn call_to_return(&self, call_site: &S, return_site: &S, fact: &F) -> Vec<F>;

    /// Enter `callee` from `call_site` (argument binding).
    fn call_to_start(&self, call_site: &S, callee: &M, fact: &F) -> Vec<F>;

    /// Compose a callee exit fact back into the caller at `return_site`.
    fn exit_to_return_site(&self, call_site: &S, return_site: &S, exit: &S, exit_fact: &F)
        -> Vec<F>;
}

/// Analyzer-level events raised while recording a new path edge.
///
/// Summary edges and findings are produced here, not by the tabulation
/// core: the core only propagates edges.
#[derive(Debug, Clone)]
pub enum AnalyzerEvent<S, F, Fi> {
    /// The edge ends at a method exit and becomes a reusable summary.
    NewSummaryEdge { edge: Edge<S, F> },
    /// A sink (or other rule) condition fired on this edge.
    NewFinding { finding: Fi },
    /// The edge should be injected into a coexisting runner.
    EdgeForOtherRunner { edge: Edge<S, F>, other: RunnerId },
}

/// One logical analysis (forward taint, backward taint, ...).
///
/// `handle_new_edge` is invoked exactly once per newly recorded path edge
/// (re-derivations only append reasons) and must emit
/// [`AnalyzerEvent::NewSummaryEdge`] for edges ending at a method exit,
/// otherwise callers will never see the callee's summaries.
pub trait Analyzer<M, S, F, Fi>: Send + Sync {
    fn flow_functions(&self) -> &dyn FlowFunctions<M, S, F>;

    /// Facts seeding the analysis of `method` (paired with every entry
    /// point as a start-marker self edge).
    fn obtain_possible_start_facts(&self, method: &M) -> Vec<F>;

    fn handle_new_edge(&self, edge: &Edge<S, F>) -> Vec<AnalyzerEvent<S, F, Fi>>;
}
