//! Actor system: root actor ownership, external sends and completion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::actor::{spawn_actor, Actor, ActorRef};
use crate::error::ActorError;
use crate::watcher::{run_watcher, ActorId, Snapshot, WatcherMessage};

/// State shared by every actor of one system: the watcher channel and the
/// actor id allocator. Analysis state never lives here.
pub(crate) struct SystemShared {
    name: String,
    watcher_tx: mpsc::UnboundedSender<WatcherMessage>,
    next_id: AtomicU64,
}

impl SystemShared {
    pub(crate) fn next_actor_id(&self) -> ActorId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn watch(&self, message: WatcherMessage) {
        let _ = self.watcher_tx.send(message);
    }
}

/// An actor system with a single user-facing root actor.
///
/// The caller injects messages with [`ActorSystem::send`] / `ask`; the root
/// actor spawns whatever tree of children it needs. External sends are
/// tallied against a system-owned pseudo-actor snapshot so the watcher's
/// sent/received totals balance.
///
/// Must be created inside a tokio runtime.
pub struct ActorSystem<M> {
    shared: Arc<SystemShared>,
    root: ActorRef<M>,
    external_id: ActorId,
    external_sent: Mutex<u64>,
}

impl<M: Send + 'static> ActorSystem<M> {
    pub fn new<A>(name: impl Into<String>, root_actor: A) -> Self
    where
        A: Actor<Message = M>,
    {
        let name = name.into();
        let (watcher_tx, watcher_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_watcher(watcher_rx));

        let shared = Arc::new(SystemShared {
            name: name.clone(),
            watcher_tx,
            next_id: AtomicU64::new(0),
        });

        let external_id = shared.next_actor_id();
        shared.watch(WatcherMessage::Register {
            id: external_id,
            path: Arc::from(format!("/{name}")),
        });
        // The pseudo actor has no worker loop behind it, so it reports
        // idle immediately instead of waiting for a first poll.
        shared.watch(WatcherMessage::Update {
            id: external_id,
            snapshot: Snapshot::idle(0, 0),
        });

        let root = spawn_actor(&shared, &format!("/{name}"), "root", root_actor);
        tracing::info!(system = %name, "actor system started");

        ActorSystem {
            shared,
            root,
            external_id,
            external_sent: Mutex::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn root_ref(&self) -> ActorRef<M> {
        self.root.clone()
    }

    /// Fire-and-forget send to the root actor.
    pub fn send(&self, message: M) {
        if self.root.deliver(message) {
            let mut sent = self.external_sent.lock();
            *sent += 1;
            self.shared.watch(WatcherMessage::Update {
                id: self.external_id,
                snapshot: Snapshot::idle(*sent, 0),
            });
        } else {
            tracing::warn!(system = %self.shared.name, "send to terminated root actor");
        }
    }

    /// Request/response: `build` receives the single-use reply channel and
    /// produces the message to send.
    pub async fn ask<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> M,
    ) -> crate::Result<R> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx));
        rx.await.map_err(|_| ActorError::AskCanceled)
    }

    /// Block until the watcher observes global quiescence: every actor idle
    /// and no message in flight.
    pub async fn await_completion(&self) {
        let (tx, rx) = oneshot::channel();
        self.shared.watch(WatcherMessage::AwaitCompletion(tx));
        let _ = rx.await;
    }

    /// Cooperative stop: cascades through the ownership tree. A message
    /// already being processed completes first.
    pub fn stop(&self) {
        self.root.signal_stop();
    }

    /// Undo a previous stop (or a failure-induced pause of the root actor).
    pub fn resume(&self) {
        self.root.signal_resume();
    }
}
