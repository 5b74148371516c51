//! Project router: the root actor of the engine.
//!
//! Owns one runner actor per (chunk, runner id) pair, spawned lazily on
//! first use, and forwards every runner message to the actor owning the
//! statement it carries. Also hosts the two indirections that need a
//! global view: call resolution and whole-system data collection.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::debug;

use taintgraph_actors::{Actor, ActorContext, ActorError, ActorRef};

use crate::context::IfdsContext;
use crate::domain::{Chunk, Edge, Fact, Finding, Method, RunnerId, Stmt};
use crate::messages::{CollectHandle, EngineMessage, RunnerMessage};
use crate::runner::RunnerActor;

pub struct ProjectActor<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    context: Arc<IfdsContext<M, S, F, Fi>>,
    runners: FxHashMap<(Chunk, RunnerId), ActorRef<RunnerMessage<M, S, F, Fi>>>,
}

impl<M, S, F, Fi> ProjectActor<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    pub fn new(context: Arc<IfdsContext<M, S, F, Fi>>) -> Self {
        ProjectActor {
            context,
            runners: FxHashMap::default(),
        }
    }

    fn chunk_of_stmt(&self, stmt: &S) -> Chunk {
        let method = self.context.graph.method_of(stmt);
        self.context.chunk_strategy.chunk_of(&method)
    }

    /// The statement whose owning chunk must process `message`.
    ///
    /// Edge-bearing variants route on the edge's end statement;
    /// subscriptions route to the callee's chunk and notifications back to
    /// the caller's, which is what lets a summary flow between chunks.
    fn routing_stmt<'m>(message: &'m RunnerMessage<M, S, F, Fi>) -> Option<&'m S> {
        match message {
            RunnerMessage::NewEdge { edge, .. }
            | RunnerMessage::ResolvedCall { edge, .. }
            | RunnerMessage::NoResolvedCall { edge, .. } => Some(&edge.to.stmt),
            RunnerMessage::SubscriptionOnStart { start_vertex, .. } => Some(&start_vertex.stmt),
            RunnerMessage::NotificationOnEnd { caller_edge, .. } => Some(&caller_edge.to.stmt),
            RunnerMessage::ObtainData { .. } => None,
        }
    }

    fn runner_id(message: &RunnerMessage<M, S, F, Fi>) -> Option<&RunnerId> {
        match message {
            RunnerMessage::NewEdge { runner, .. }
            | RunnerMessage::ResolvedCall { runner, .. }
            | RunnerMessage::NoResolvedCall { runner, .. }
            | RunnerMessage::SubscriptionOnStart { runner, .. }
            | RunnerMessage::NotificationOnEnd { runner, .. } => Some(runner),
            RunnerMessage::ObtainData { .. } => None,
        }
    }

    fn ensure_runner(
        &mut self,
        ctx: &mut ActorContext<EngineMessage<M, S, F, Fi>>,
        chunk: Chunk,
        runner: RunnerId,
    ) -> taintgraph_actors::Result<ActorRef<RunnerMessage<M, S, F, Fi>>> {
        if let Some(actor_ref) = self.runners.get(&(chunk.clone(), runner.clone())) {
            return Ok(actor_ref.clone());
        }
        let actor = RunnerActor::new(Arc::clone(&self.context), runner.clone(), ctx.self_ref())
            .map_err(|error| ActorError::handler(error.to_string()))?;
        // Chunk and runner ids are caller-supplied strings that may contain
        // any separator; the index keeps sibling names unique regardless.
        let name = format!("runner-{}-{chunk}-{runner}", self.runners.len());
        debug!(%chunk, %runner, "spawning runner actor");
        let actor_ref = ctx.spawn(&name, actor);
        self.runners.insert((chunk, runner), actor_ref.clone());
        Ok(actor_ref)
    }

    fn route(
        &mut self,
        ctx: &mut ActorContext<EngineMessage<M, S, F, Fi>>,
        message: RunnerMessage<M, S, F, Fi>,
    ) -> taintgraph_actors::Result<()> {
        let (stmt, runner) = match (Self::routing_stmt(&message), Self::runner_id(&message)) {
            (Some(stmt), Some(runner)) => (stmt.clone(), runner.clone()),
            _ => {
                return Err(ActorError::handler(
                    "data collection must go through CollectAllData",
                ))
            }
        };
        let chunk = self.chunk_of_stmt(&stmt);
        let target = self.ensure_runner(ctx, chunk, runner)?;
        ctx.send(&target, message);
        Ok(())
    }

    /// Resolve a call-site edge's callees and answer the asking runner with
    /// one `ResolvedCall` per callee, or a single `NoResolvedCall`.
    fn resolve_call(
        &mut self,
        ctx: &mut ActorContext<EngineMessage<M, S, F, Fi>>,
        runner: RunnerId,
        edge: Edge<S, F>,
    ) -> taintgraph_actors::Result<()> {
        let callees = self.context.graph.callees(&edge.to.stmt);
        if callees.is_empty() {
            return self.route(
                ctx,
                RunnerMessage::NoResolvedCall { runner, edge },
            );
        }
        for callee in callees {
            self.route(
                ctx,
                RunnerMessage::ResolvedCall {
                    runner: runner.clone(),
                    edge: edge.clone(),
                    callee,
                },
            )?;
        }
        Ok(())
    }
}

#[async_trait]
impl<M, S, F, Fi> Actor for ProjectActor<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    type Message = EngineMessage<M, S, F, Fi>;

    async fn receive(
        &mut self,
        message: Self::Message,
        ctx: &mut ActorContext<Self::Message>,
    ) -> taintgraph_actors::Result<()> {
        match message {
            EngineMessage::Runner(inner) => self.route(ctx, inner),
            EngineMessage::UnresolvedCall { runner, edge } => {
                self.resolve_call(ctx, runner, edge)
            }
            EngineMessage::CollectAllData { reply } => {
                let (tx, rx) = mpsc::unbounded_channel();
                for target in self.runners.values() {
                    let target = target.clone();
                    ctx.send(&target, RunnerMessage::ObtainData { reply: tx.clone() });
                }
                let handle = CollectHandle {
                    runners: self.runners.len(),
                    rx,
                };
                // Collector gone means nobody waits for the data.
                let _ = reply.send(handle);
                Ok(())
            }
        }
    }
}
