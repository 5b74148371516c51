//! Engine facade: seed, run to quiescence, collect.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use taintgraph_actors::ActorSystem;

use crate::context::IfdsContext;
use crate::domain::{Edge, Fact, Finding, Method, Reason, RunnerId, Stmt, Vertex};
use crate::errors::Result;
use crate::messages::{EngineMessage, RunnerMessage};
use crate::result::{merge_computation_data, IfdsComputationData};
use crate::router::ProjectActor;

/// A running IFDS engine over one application graph.
///
/// Must be created inside a tokio runtime. The usual lifecycle is
/// [`start_analysis`](Self::start_analysis) for each entry method,
/// [`run_analysis`](Self::run_analysis), then
/// [`collect_computation_data`](Self::collect_computation_data).
pub struct IfdsSystem<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    context: Arc<IfdsContext<M, S, F, Fi>>,
    system: ActorSystem<EngineMessage<M, S, F, Fi>>,
}

impl<M, S, F, Fi> IfdsSystem<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    pub fn new(name: impl Into<String>, context: Arc<IfdsContext<M, S, F, Fi>>) -> Self {
        let system = ActorSystem::new(name, ProjectActor::new(Arc::clone(&context)));
        IfdsSystem { context, system }
    }

    /// Seed `method` for `runner`: a start-marker self edge per (entry
    /// point, start fact) pair.
    pub fn start_analysis(&self, runner: &RunnerId, method: &M) -> Result<()> {
        let spec = self.context.spec(runner)?;
        let facts = spec.analyzer.obtain_possible_start_facts(method);
        let entries = self.context.graph.entry_points(method);
        info!(%runner, ?method, seeds = facts.len() * entries.len(), "seeding analysis");
        for entry in &entries {
            for fact in &facts {
                let vertex = Vertex::new(entry.clone(), fact.clone());
                self.submit_edge(
                    runner.clone(),
                    Edge::new(vertex.clone(), vertex),
                    Reason::Initial,
                );
            }
        }
        Ok(())
    }

    /// Inject an arbitrary edge, e.g. an externally known seed.
    pub fn submit_edge(&self, runner: RunnerId, edge: Edge<S, F>, reason: Reason<S, F>) {
        self.system.send(EngineMessage::Runner(RunnerMessage::NewEdge {
            runner,
            edge,
            reason,
        }));
    }

    /// Wait for the fixed point, bounded by `timeout` if given.
    ///
    /// On timeout the engine is stopped cooperatively and drained, so a
    /// subsequent collection still returns everything derived so far.
    /// Returns whether the fixed point was reached within the bound.
    pub async fn run_analysis(&self, timeout: Option<Duration>) -> bool {
        match timeout {
            None => {
                self.system.await_completion().await;
                true
            }
            Some(limit) => {
                tokio::select! {
                    _ = self.system.await_completion() => true,
                    _ = tokio::time::sleep(limit) => {
                        warn!(?limit, "analysis timed out, stopping actors");
                        self.system.stop();
                        self.system.await_completion().await;
                        // Resume so collection messages are not discarded;
                        // the mailboxes are already drained at this point.
                        self.system.resume();
                        false
                    }
                }
            }
        }
    }

    /// Gather and merge the computation data of every runner actor.
    pub async fn collect_computation_data(&self) -> Result<IfdsComputationData<S, F, Fi>> {
        let mut handle = self
            .system
            .ask(|reply| EngineMessage::CollectAllData { reply })
            .await?;
        let mut parts = Vec::with_capacity(handle.runners);
        while parts.len() < handle.runners {
            match handle.rx.recv().await {
                Some(part) => parts.push(part),
                // A runner terminated without answering; merge what we have.
                None => break,
            }
        }
        Ok(merge_computation_data(parts))
    }

    pub async fn await_completion(&self) {
        self.system.await_completion().await;
    }

    pub fn stop(&self) {
        self.system.stop();
    }

    pub fn resume(&self) {
        self.system.resume();
    }

    pub fn context(&self) -> &IfdsContext<M, S, F, Fi> {
        &self.context
    }
}
