//! Engine configuration: the application graph, the chunk strategy, and
//! the registered runners.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::analyzer::Analyzer;
use crate::chunk::ChunkStrategy;
use crate::domain::{Fact, Finding, Method, RunnerId, Stmt};
use crate::errors::{EngineError, Result};
use crate::graph::ApplicationGraph;

/// Per-runner configuration.
pub struct RunnerSpec<M, S, F, Fi> {
    pub analyzer: Arc<dyn Analyzer<M, S, F, Fi>>,
    /// Whether edges injected by coexisting runners are recorded. Off by
    /// default: a runner that never expects cross-runner edges silently
    /// drops them instead of polluting its tables.
    pub accept_foreign_edges: bool,
}

impl<M, S, F, Fi> Clone for RunnerSpec<M, S, F, Fi> {
    fn clone(&self) -> Self {
        RunnerSpec {
            analyzer: Arc::clone(&self.analyzer),
            accept_foreign_edges: self.accept_foreign_edges,
        }
    }
}

/// Immutable context shared by the router and every runner actor.
pub struct IfdsContext<M, S, F, Fi>
where
    S: Stmt,
{
    pub graph: Arc<dyn ApplicationGraph<M, S>>,
    pub chunk_strategy: Arc<dyn ChunkStrategy<M>>,
    runners: FxHashMap<RunnerId, RunnerSpec<M, S, F, Fi>>,
}

impl<M, S, F, Fi> IfdsContext<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    pub fn new(
        graph: Arc<dyn ApplicationGraph<M, S>>,
        chunk_strategy: Arc<dyn ChunkStrategy<M>>,
    ) -> Self {
        IfdsContext {
            graph,
            chunk_strategy,
            runners: FxHashMap::default(),
        }
    }

    /// Register an analysis instance under `runner`. Later registrations
    /// under the same id replace earlier ones.
    pub fn register_analyzer(
        &mut self,
        runner: RunnerId,
        analyzer: Arc<dyn Analyzer<M, S, F, Fi>>,
        accept_foreign_edges: bool,
    ) {
        self.runners.insert(
            runner,
            RunnerSpec {
                analyzer,
                accept_foreign_edges,
            },
        );
    }

    pub fn spec(&self, runner: &RunnerId) -> Result<&RunnerSpec<M, S, F, Fi>> {
        self.runners
            .get(runner)
            .ok_or_else(|| EngineError::UnknownRunner(runner.as_str().to_string()))
    }

    pub fn runner_ids(&self) -> impl Iterator<Item = &RunnerId> {
        self.runners.keys()
    }
}
