//! Actor trait, references, contexts and the per-actor worker loop.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::ActorError;
use crate::system::SystemShared;
use crate::watcher::{ActorId, ActorStatus, Snapshot, WatcherMessage};

/// Control and user payloads share one ordered mailbox, so a `Stop` takes
/// effect only after the messages sent before it by the same sender.
pub(crate) enum Envelope<M> {
    User(M),
    Stop,
    Resume,
}

/// A message-processing entity bound to an exclusive worker task.
///
/// State owned by an actor is never shared: the runtime guarantees that
/// `receive` runs for one message at a time.
#[async_trait]
pub trait Actor: Send + 'static {
    type Message: Send + 'static;

    /// Process one user message. Returning an error pauses the actor (it
    /// discards further user messages until resumed) but does not affect
    /// any other actor.
    async fn receive(
        &mut self,
        message: Self::Message,
        ctx: &mut ActorContext<Self::Message>,
    ) -> crate::Result<()>;

    /// Invoked with the error that paused this actor, before the pause
    /// takes effect. Default: no-op.
    fn on_failure(&mut self, _error: &ActorError) {}
}

/// Cheap cloneable handle to an actor's mailbox.
pub struct ActorRef<M> {
    pub(crate) id: ActorId,
    pub(crate) path: Arc<str>,
    pub(crate) tx: mpsc::UnboundedSender<Envelope<M>>,
}

impl<M> Clone for ActorRef<M> {
    fn clone(&self) -> Self {
        ActorRef {
            id: self.id,
            path: self.path.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<M> std::fmt::Debug for ActorRef<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef").field("path", &self.path).finish()
    }
}

impl<M: Send + 'static> ActorRef<M> {
    /// Hierarchical name of the actor, e.g. `/taint/root/runner-m0-forward`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn deliver(&self, message: M) -> bool {
        self.tx.send(Envelope::User(message)).is_ok()
    }

    pub(crate) fn signal_stop(&self) {
        let _ = self.tx.send(Envelope::Stop);
    }

    pub(crate) fn signal_resume(&self) {
        let _ = self.tx.send(Envelope::Resume);
    }
}

/// Type-erased control handle so a parent can cascade stop/resume to
/// children with heterogeneous message types.
pub(crate) trait ControlPort: Send {
    fn stop(&self);
    fn resume(&self);
}

impl<M: Send + 'static> ControlPort for ActorRef<M> {
    fn stop(&self) {
        self.signal_stop();
    }

    fn resume(&self) {
        self.signal_resume();
    }
}

/// Per-actor execution context: counted sends, child supervision and
/// snapshot reporting. Owned exclusively by the actor's worker task.
pub struct ActorContext<M> {
    shared: Arc<SystemShared>,
    self_ref: ActorRef<M>,
    sent: u64,
    received: u64,
    paused: bool,
    children: Vec<Box<dyn ControlPort>>,
    child_names: FxHashSet<String>,
}

impl<M: Send + 'static> ActorContext<M> {
    pub fn self_ref(&self) -> ActorRef<M> {
        self.self_ref.clone()
    }

    pub fn path(&self) -> &str {
        self.self_ref.path()
    }

    /// Fire-and-forget send, tallied for termination detection.
    ///
    /// A send to a closed mailbox is dropped with a warning and not
    /// counted, so the watcher's totals stay balanced.
    pub fn send<N: Send + 'static>(&mut self, target: &ActorRef<N>, message: N) {
        if target.deliver(message) {
            self.sent += 1;
        } else {
            tracing::warn!(
                from = self.self_ref.path(),
                to = target.path(),
                "dropping message to closed mailbox"
            );
        }
    }

    /// Spawn a named child actor.
    ///
    /// Duplicate names within one parent are a programming error and fail
    /// fast.
    pub fn spawn<A: Actor>(&mut self, name: &str, actor: A) -> ActorRef<A::Message> {
        if !self.child_names.insert(name.to_string()) {
            panic!(
                "duplicate child actor name '{}' under '{}'",
                name,
                self.self_ref.path()
            );
        }
        let child = spawn_actor(&self.shared, self.self_ref.path(), name, actor);
        self.children.push(Box::new(child.clone()));
        child
    }

    fn report(&self, status: ActorStatus) {
        let snapshot = Snapshot {
            status,
            sent: self.sent,
            received: self.received,
        };
        self.shared.watch(WatcherMessage::Update {
            id: self.self_ref.id,
            snapshot,
        });
    }

    fn cascade_stop(&mut self) {
        self.paused = true;
        for child in &self.children {
            child.stop();
        }
    }

    fn cascade_resume(&mut self) {
        self.paused = false;
        for child in &self.children {
            child.resume();
        }
    }
}

/// Register an actor with the watcher and start its worker task.
pub(crate) fn spawn_actor<A: Actor>(
    shared: &Arc<SystemShared>,
    parent_path: &str,
    name: &str,
    actor: A,
) -> ActorRef<A::Message> {
    let id = shared.next_actor_id();
    let path: Arc<str> = Arc::from(format!("{parent_path}/{name}"));
    let (tx, rx) = mpsc::unbounded_channel();
    let actor_ref = ActorRef {
        id,
        path: path.clone(),
        tx,
    };

    // Registration precedes any message this actor could ever receive,
    // because the spawner holds the only reference until we return.
    shared.watch(WatcherMessage::Register {
        id,
        path: path.clone(),
    });

    let ctx = ActorContext {
        shared: shared.clone(),
        self_ref: actor_ref.clone(),
        sent: 0,
        received: 0,
        paused: false,
        children: Vec::new(),
        child_names: FxHashSet::default(),
    };
    tokio::spawn(run_actor(actor, rx, ctx));
    tracing::debug!(actor = %path, "spawned actor");
    actor_ref
}

/// The exclusive worker loop: drain the mailbox, reporting an idle snapshot
/// on empty and a busy snapshot when work arrives again.
async fn run_actor<A: Actor>(
    mut actor: A,
    mut rx: mpsc::UnboundedReceiver<Envelope<A::Message>>,
    mut ctx: ActorContext<A::Message>,
) {
    loop {
        let envelope = match rx.try_recv() {
            Ok(envelope) => envelope,
            Err(TryRecvError::Empty) => {
                ctx.report(ActorStatus::Idle);
                match rx.recv().await {
                    Some(envelope) => {
                        ctx.report(ActorStatus::Busy);
                        envelope
                    }
                    None => break,
                }
            }
            // An actor starts out registered as busy, which covers messages
            // delivered before this task's first poll: they are consumed on
            // the fast path above and tallied by the idle report below.
            Err(TryRecvError::Disconnected) => break,
        };

        match envelope {
            Envelope::Stop => {
                tracing::debug!(actor = ctx.path(), "stop signal");
                ctx.cascade_stop();
            }
            Envelope::Resume => {
                tracing::debug!(actor = ctx.path(), "resume signal");
                ctx.cascade_resume();
            }
            Envelope::User(message) => {
                ctx.received += 1;
                if ctx.paused {
                    tracing::trace!(actor = ctx.path(), "paused, discarding message");
                    continue;
                }
                if let Err(error) = actor.receive(message, &mut ctx).await {
                    tracing::error!(actor = ctx.path(), %error, "handler failed, pausing actor");
                    actor.on_failure(&error);
                    ctx.paused = true;
                    // A failed actor must still feed termination detection,
                    // or await_completion would hang forever.
                    ctx.report(ActorStatus::Idle);
                }
            }
        }
    }
    // Final snapshot so a terminated actor never stays busy in the watcher.
    ctx.report(ActorStatus::Idle);
    tracing::debug!(actor = ctx.path(), "mailbox closed, actor terminated");
}
