//! Message protocol between the router and the runner actors.

use tokio::sync::{mpsc, oneshot};

use crate::domain::{Edge, Fact, Reason, RunnerId, Stmt, Vertex};
use crate::result::IfdsComputationData;

/// Messages addressed to a specific (chunk, runner) actor. The router
/// derives the chunk from the statement each variant carries; the `runner`
/// field selects the logical analysis instance within the chunk.
pub enum RunnerMessage<M, S, F, Fi>
where
    S: Stmt,
    F: Fact,
{
    /// A derived path edge with the reason that produced it.
    NewEdge {
        runner: RunnerId,
        edge: Edge<S, F>,
        reason: Reason<S, F>,
    },
    /// One resolved callee of a call-site edge (one message per callee).
    ResolvedCall {
        runner: RunnerId,
        edge: Edge<S, F>,
        callee: M,
    },
    /// The call site had no resolvable callees. Conservative no-op: the
    /// caller-side facts already flowed through call-to-return.
    NoResolvedCall { runner: RunnerId, edge: Edge<S, F> },
    /// A caller registers interest in summaries starting at a callee's
    /// start vertex. Routed to the callee's chunk.
    SubscriptionOnStart {
        runner: RunnerId,
        start_vertex: Vertex<S, F>,
        subscriber: RunnerId,
        caller_edge: Edge<S, F>,
    },
    /// A summary edge for a start vertex some caller subscribed to.
    /// Routed back to the caller's chunk.
    NotificationOnEnd {
        runner: RunnerId,
        summary_edge: Edge<S, F>,
        caller_edge: Edge<S, F>,
    },
    /// Materialize this runner's accumulated computation data.
    ObtainData {
        reply: mpsc::UnboundedSender<IfdsComputationData<S, F, Fi>>,
    },
}

/// Everything the reply of [`EngineMessage::CollectAllData`] needs: how
/// many runner actors were asked, and the channel their data arrives on.
pub struct CollectHandle<S, F, Fi>
where
    S: Stmt,
    F: Fact,
{
    pub runners: usize,
    pub rx: mpsc::UnboundedReceiver<IfdsComputationData<S, F, Fi>>,
}

/// Top-level protocol of the engine's root (router) actor.
pub enum EngineMessage<M, S, F, Fi>
where
    S: Stmt,
    F: Fact,
{
    /// Route to the owning (chunk, runner) actor, spawning it lazily.
    Runner(RunnerMessage<M, S, F, Fi>),
    /// Indirection: resolve the callees of a call-site edge and send the
    /// asking runner one `ResolvedCall` per callee (or `NoResolvedCall`).
    UnresolvedCall { runner: RunnerId, edge: Edge<S, F> },
    /// Fan out `ObtainData` to every spawned runner actor.
    CollectAllData {
        reply: oneshot::Sender<CollectHandle<S, F, Fi>>,
    },
}
