//! Flow-function adapter: translates flow-function outputs into edge
//! messages and forwards analyzer-level events. Pure translation, no
//! analysis logic of its own.

use std::sync::Arc;

use taintgraph_actors::{ActorContext, ActorRef};

use crate::analyzer::Analyzer;
use crate::domain::{Edge, Fact, Finding, Method, Reason, RunnerId, Stmt, Vertex};
use crate::messages::{EngineMessage, RunnerMessage};

type RunnerCtx<M, S, F, Fi> = ActorContext<RunnerMessage<M, S, F, Fi>>;

pub struct FlowFunctionAdapter<M, S, F, Fi>
where
    S: Stmt,
    F: Fact,
{
    runner: RunnerId,
    analyzer: Arc<dyn Analyzer<M, S, F, Fi>>,
    parent: ActorRef<EngineMessage<M, S, F, Fi>>,
}

impl<M, S, F, Fi> FlowFunctionAdapter<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    pub fn new(
        runner: RunnerId,
        analyzer: Arc<dyn Analyzer<M, S, F, Fi>>,
        parent: ActorRef<EngineMessage<M, S, F, Fi>>,
    ) -> Self {
        FlowFunctionAdapter {
            runner,
            analyzer,
            parent,
        }
    }

    pub fn analyzer(&self) -> &dyn Analyzer<M, S, F, Fi> {
        self.analyzer.as_ref()
    }

    /// Enqueue any runner message through the router (counted send).
    pub fn send_runner(&self, ctx: &mut RunnerCtx<M, S, F, Fi>, message: RunnerMessage<M, S, F, Fi>) {
        let parent = self.parent.clone();
        ctx.send(&parent, EngineMessage::Runner(message));
    }

    fn emit_edge(
        &self,
        ctx: &mut RunnerCtx<M, S, F, Fi>,
        edge: Edge<S, F>,
        reason: Reason<S, F>,
    ) {
        self.send_runner(
            ctx,
            RunnerMessage::NewEdge {
                runner: self.runner.clone(),
                edge,
                reason,
            },
        );
    }

    /// Sequent flow: facts at `next` derived from the current edge.
    pub fn apply_sequent(
        &self,
        ctx: &mut RunnerCtx<M, S, F, Fi>,
        current_edge: &Edge<S, F>,
        next: &S,
    ) {
        let facts =
            self.analyzer
                .flow_functions()
                .sequent(&current_edge.to.stmt, next, &current_edge.to.fact);
        for fact in facts {
            let edge = Edge::new(
                current_edge.from.clone(),
                Vertex::new(next.clone(), fact),
            );
            self.emit_edge(
                ctx,
                edge,
                Reason::Sequent {
                    edge: current_edge.clone(),
                },
            );
        }
    }

    /// Call-site skip to a return site.
    pub fn apply_call_to_return(
        &self,
        ctx: &mut RunnerCtx<M, S, F, Fi>,
        current_edge: &Edge<S, F>,
        return_site: &S,
    ) {
        let facts = self.analyzer.flow_functions().call_to_return(
            &current_edge.to.stmt,
            return_site,
            &current_edge.to.fact,
        );
        for fact in facts {
            let edge = Edge::new(
                current_edge.from.clone(),
                Vertex::new(return_site.clone(), fact),
            );
            self.emit_edge(
                ctx,
                edge,
                Reason::CallToReturn {
                    edge: current_edge.clone(),
                },
            );
        }
    }

    /// Entering a resolved callee: registers a start subscription and
    /// seeds the callee's start-marker self edge for every entry point.
    /// The callee-side runner deduplicates re-seeding, which is what
    /// bounds recursion.
    pub fn apply_call_to_start(
        &self,
        ctx: &mut RunnerCtx<M, S, F, Fi>,
        current_edge: &Edge<S, F>,
        callee: &M,
        entry_points: &[S],
    ) {
        let facts = self.analyzer.flow_functions().call_to_start(
            &current_edge.to.stmt,
            callee,
            &current_edge.to.fact,
        );
        for fact in facts {
            for entry in entry_points {
                let start = Vertex::new(entry.clone(), fact.clone());
                self.send_runner(
                    ctx,
                    RunnerMessage::SubscriptionOnStart {
                        runner: self.runner.clone(),
                        start_vertex: start.clone(),
                        subscriber: self.runner.clone(),
                        caller_edge: current_edge.clone(),
                    },
                );
                self.emit_edge(
                    ctx,
                    Edge::new(start.clone(), start),
                    Reason::CallToStart {
                        caller_edge: current_edge.clone(),
                    },
                );
            }
        }
    }

    /// Compose a callee summary into the caller at one return site.
    pub fn apply_exit_to_return_site(
        &self,
        ctx: &mut RunnerCtx<M, S, F, Fi>,
        caller_edge: &Edge<S, F>,
        summary_edge: &Edge<S, F>,
        return_site: &S,
    ) {
        let facts = self.analyzer.flow_functions().exit_to_return_site(
            &caller_edge.to.stmt,
            return_site,
            &summary_edge.to.stmt,
            &summary_edge.to.fact,
        );
        for fact in facts {
            let edge = Edge::new(
                caller_edge.from.clone(),
                Vertex::new(return_site.clone(), fact),
            );
            self.emit_edge(
                ctx,
                edge,
                Reason::ExitToReturnSite {
                    summary_edge: summary_edge.clone(),
                    caller_edge: caller_edge.clone(),
                },
            );
        }
    }

    /// Ask the router to resolve the callees of a call-site edge.
    pub fn request_call_resolution(
        &self,
        ctx: &mut RunnerCtx<M, S, F, Fi>,
        current_edge: &Edge<S, F>,
    ) {
        let parent = self.parent.clone();
        ctx.send(
            &parent,
            EngineMessage::UnresolvedCall {
                runner: self.runner.clone(),
                edge: current_edge.clone(),
            },
        );
    }

    /// Inject an edge into a coexisting runner; whether the target
    /// consumes it is that runner's policy.
    pub fn forward_to_other_runner(
        &self,
        ctx: &mut RunnerCtx<M, S, F, Fi>,
        edge: Edge<S, F>,
        other: RunnerId,
    ) {
        self.send_runner(
            ctx,
            RunnerMessage::NewEdge {
                runner: other,
                edge: edge.clone(),
                reason: Reason::FromOtherRunner {
                    edge,
                    other: self.runner.clone(),
                },
            },
        );
    }
}
