//! Runner actor: the tabulation core.
//!
//! # Overview
//!
//! One runner actor owns every path edge whose end statement falls inside
//! its chunk, for one logical analysis instance. It records edges and the
//! reasons that derived them, dispatches flow functions over new edges,
//! keeps summary edges and start subscriptions for the methods of its
//! chunk, and answers data-collection requests.
//!
//! Propagation is idempotent: an already known edge only appends its
//! reason and triggers nothing else, which is what makes the fixed point
//! terminate on recursive call graphs.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use taintgraph_actors::{Actor, ActorContext, ActorRef};

use crate::adapter::FlowFunctionAdapter;
use crate::analyzer::AnalyzerEvent;
use crate::context::IfdsContext;
use crate::domain::{Edge, Fact, Finding, Method, Reason, RunnerId, Stmt, Vertex};
use crate::messages::{EngineMessage, RunnerMessage};
use crate::result::IfdsComputationData;

pub struct RunnerActor<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    context: Arc<IfdsContext<M, S, F, Fi>>,
    runner: RunnerId,
    adapter: FlowFunctionAdapter<M, S, F, Fi>,
    accept_foreign_edges: bool,

    path_edges: FxHashSet<Edge<S, F>>,
    reasons: FxHashMap<Edge<S, F>, FxHashSet<Reason<S, F>>>,
    /// Summary end vertices keyed by the callee start vertex.
    summary_ends_by_start: FxHashMap<Vertex<S, F>, FxHashSet<Vertex<S, F>>>,
    /// Subscribed (caller edge, subscriber runner) pairs per start vertex.
    start_subscribers: FxHashMap<Vertex<S, F>, FxHashSet<(Edge<S, F>, RunnerId)>>,
    findings: Vec<Fi>,
}

impl<M, S, F, Fi> RunnerActor<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    pub fn new(
        context: Arc<IfdsContext<M, S, F, Fi>>,
        runner: RunnerId,
        parent: ActorRef<EngineMessage<M, S, F, Fi>>,
    ) -> crate::errors::Result<Self> {
        let spec = context.spec(&runner)?;
        let adapter =
            FlowFunctionAdapter::new(runner.clone(), Arc::clone(&spec.analyzer), parent);
        let accept_foreign_edges = spec.accept_foreign_edges;
        Ok(RunnerActor {
            context,
            runner,
            adapter,
            accept_foreign_edges,
            path_edges: FxHashSet::default(),
            reasons: FxHashMap::default(),
            summary_ends_by_start: FxHashMap::default(),
            start_subscribers: FxHashMap::default(),
            findings: Vec::new(),
        })
    }

    /// Record `edge` with `reason`. Returns true when the edge itself is
    /// new; a repeated edge only appends the reason.
    fn record_edge(&mut self, edge: &Edge<S, F>, reason: Reason<S, F>) -> bool {
        self.reasons.entry(edge.clone()).or_default().insert(reason);
        self.path_edges.insert(edge.clone())
    }

    fn handle_new_edge(
        &mut self,
        ctx: &mut ActorContext<RunnerMessage<M, S, F, Fi>>,
        edge: Edge<S, F>,
        reason: Reason<S, F>,
    ) {
        if let Reason::FromOtherRunner { other, .. } = &reason {
            if !self.accept_foreign_edges {
                trace!(runner = %self.runner, from = %other, "dropping foreign edge");
                return;
            }
        }

        if !self.record_edge(&edge, reason) {
            return;
        }
        trace!(runner = %self.runner, ?edge, "new path edge");

        for event in self.adapter.analyzer().handle_new_edge(&edge) {
            self.handle_analyzer_event(ctx, event);
        }

        let stmt = &edge.to.stmt;
        let graph = Arc::clone(&self.context.graph);
        if graph.is_exit_point(stmt) {
            // Summary recording happens through the analyzer's
            // NewSummaryEdge event; the core propagates nothing here.
        } else if graph.is_call_site(stmt) {
            for return_site in graph.successors(stmt) {
                self.adapter.apply_call_to_return(ctx, &edge, &return_site);
            }
            self.adapter.request_call_resolution(ctx, &edge);
        } else {
            for next in graph.successors(stmt) {
                self.adapter.apply_sequent(ctx, &edge, &next);
            }
        }
    }

    fn handle_analyzer_event(
        &mut self,
        ctx: &mut ActorContext<RunnerMessage<M, S, F, Fi>>,
        event: AnalyzerEvent<S, F, Fi>,
    ) {
        match event {
            AnalyzerEvent::NewSummaryEdge { edge } => self.record_summary(ctx, edge),
            AnalyzerEvent::NewFinding { finding } => {
                debug!(runner = %self.runner, ?finding, "new finding");
                self.findings.push(finding);
            }
            AnalyzerEvent::EdgeForOtherRunner { edge, other } => {
                self.adapter.forward_to_other_runner(ctx, edge, other);
            }
        }
    }

    fn record_summary(
        &mut self,
        ctx: &mut ActorContext<RunnerMessage<M, S, F, Fi>>,
        summary_edge: Edge<S, F>,
    ) {
        let inserted = self
            .summary_ends_by_start
            .entry(summary_edge.from.clone())
            .or_default()
            .insert(summary_edge.to.clone());
        if !inserted {
            return;
        }
        if let Some(subscribers) = self.start_subscribers.get(&summary_edge.from) {
            for (caller_edge, subscriber) in subscribers.clone() {
                self.adapter.send_runner(
                    ctx,
                    RunnerMessage::NotificationOnEnd {
                        runner: subscriber,
                        summary_edge: summary_edge.clone(),
                        caller_edge,
                    },
                );
            }
        }
    }

    fn handle_subscription(
        &mut self,
        ctx: &mut ActorContext<RunnerMessage<M, S, F, Fi>>,
        start_vertex: Vertex<S, F>,
        subscriber: RunnerId,
        caller_edge: Edge<S, F>,
    ) {
        // Replay summaries derived before this caller subscribed.
        if let Some(ends) = self.summary_ends_by_start.get(&start_vertex) {
            for end in ends.clone() {
                self.adapter.send_runner(
                    ctx,
                    RunnerMessage::NotificationOnEnd {
                        runner: subscriber.clone(),
                        summary_edge: Edge::new(start_vertex.clone(), end),
                        caller_edge: caller_edge.clone(),
                    },
                );
            }
        }
        self.start_subscribers
            .entry(start_vertex)
            .or_default()
            .insert((caller_edge, subscriber));
    }

    fn handle_notification(
        &mut self,
        ctx: &mut ActorContext<RunnerMessage<M, S, F, Fi>>,
        summary_edge: Edge<S, F>,
        caller_edge: Edge<S, F>,
    ) {
        let call_site = caller_edge.to.stmt.clone();
        for return_site in self.context.graph.successors(&call_site) {
            self.adapter
                .apply_exit_to_return_site(ctx, &caller_edge, &summary_edge, &return_site);
        }
    }

    fn computation_data(&self) -> IfdsComputationData<S, F, Fi> {
        let mut data = IfdsComputationData::new();
        for edge in &self.path_edges {
            data.edges_by_end
                .entry(edge.to.clone())
                .or_default()
                .insert(edge.clone());
            data.facts_by_stmt
                .entry(edge.to.stmt.clone())
                .or_default()
                .insert(edge.to.fact.clone());
        }
        data.reasons_by_edge = self.reasons.clone();
        data.findings = self.findings.clone();
        data
    }
}

#[async_trait]
impl<M, S, F, Fi> Actor for RunnerActor<M, S, F, Fi>
where
    M: Method,
    S: Stmt,
    F: Fact,
    Fi: Finding,
{
    type Message = RunnerMessage<M, S, F, Fi>;

    async fn receive(
        &mut self,
        message: Self::Message,
        ctx: &mut ActorContext<Self::Message>,
    ) -> taintgraph_actors::Result<()> {
        match message {
            RunnerMessage::NewEdge { edge, reason, .. } => {
                self.handle_new_edge(ctx, edge, reason);
            }
            RunnerMessage::ResolvedCall { edge, callee, .. } => {
                let entry_points = self.context.graph.entry_points(&callee);
                self.adapter
                    .apply_call_to_start(ctx, &edge, &callee, &entry_points);
            }
            RunnerMessage::NoResolvedCall { edge, .. } => {
                trace!(runner = %self.runner, ?edge, "call site without resolvable callees");
            }
            RunnerMessage::SubscriptionOnStart {
                start_vertex,
                subscriber,
                caller_edge,
                ..
            } => {
                self.handle_subscription(ctx, start_vertex, subscriber, caller_edge);
            }
            RunnerMessage::NotificationOnEnd {
                summary_edge,
                caller_edge,
                ..
            } => {
                self.handle_notification(ctx, summary_edge, caller_edge);
            }
            RunnerMessage::ObtainData { reply } => {
                // A dropped receiver means the collector gave up; nothing
                // useful to do with the data then.
                let _ = reply.send(self.computation_data());
            }
        }
        Ok(())
    }
}
