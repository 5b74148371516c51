//! Snapshot-based termination detection.
//!
//! Every actor reports a [`Snapshot`] to the watcher when its mailbox runs
//! empty (idle) and again when it picks up new work (busy). The watcher
//! keeps the last snapshot per actor; the system is quiescent iff every
//! registered actor is idle and the global sent total equals the global
//! received total. Counters are monotone within an actor's lifetime, so a
//! stale snapshot can only under-report, never fake quiescence.

use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};

pub(crate) type ActorId = u64;

/// Processing status reported by an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorStatus {
    /// The actor is processing a message or has pending mailbox entries.
    Busy,
    /// The actor's mailbox was empty at report time.
    Idle,
}

/// Per-actor counters reported to the watcher.
///
/// Invariant: `sent` and `received` never decrease over an actor's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub status: ActorStatus,
    pub sent: u64,
    pub received: u64,
}

impl Snapshot {
    pub fn idle(sent: u64, received: u64) -> Self {
        Snapshot {
            status: ActorStatus::Idle,
            sent,
            received,
        }
    }

    pub fn busy(sent: u64, received: u64) -> Self {
        Snapshot {
            status: ActorStatus::Busy,
            sent,
            received,
        }
    }
}

/// Quiescence predicate over the latest snapshot of every registered actor.
///
/// Quiescent iff no actor is busy and the sent/received tallies balance,
/// i.e. no message is in flight.
pub fn is_quiescent<'a, I>(snapshots: I) -> bool
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut total_sent: u64 = 0;
    let mut total_received: u64 = 0;
    for snapshot in snapshots {
        if snapshot.status == ActorStatus::Busy {
            return false;
        }
        total_sent += snapshot.sent;
        total_received += snapshot.received;
    }
    total_sent == total_received
}

pub(crate) enum WatcherMessage {
    Register {
        id: ActorId,
        path: std::sync::Arc<str>,
    },
    Update {
        id: ActorId,
        snapshot: Snapshot,
    },
    AwaitCompletion(oneshot::Sender<()>),
}

struct WatcherState {
    snapshots: FxHashMap<ActorId, Snapshot>,
    paths: FxHashMap<ActorId, std::sync::Arc<str>>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl WatcherState {
    fn new() -> Self {
        WatcherState {
            snapshots: FxHashMap::default(),
            paths: FxHashMap::default(),
            waiters: Vec::new(),
        }
    }

    fn handle(&mut self, message: WatcherMessage) {
        match message {
            WatcherMessage::Register { id, path } => {
                tracing::trace!(actor = %path, "watcher: registered");
                self.paths.insert(id, path);
                // A new actor counts as busy until its worker reports for
                // the first time: messages delivered before the first poll
                // would otherwise be invisible to the quiescence tallies.
                self.snapshots.insert(id, Snapshot::busy(0, 0));
            }
            WatcherMessage::Update { id, snapshot } => {
                if let Some(previous) = self.snapshots.get(&id) {
                    debug_assert!(
                        snapshot.sent >= previous.sent && snapshot.received >= previous.received,
                        "snapshot counters must be monotone"
                    );
                }
                self.snapshots.insert(id, snapshot);
            }
            WatcherMessage::AwaitCompletion(done) => {
                self.waiters.push(done);
            }
        }

        if !self.waiters.is_empty() && is_quiescent(self.snapshots.values()) {
            tracing::debug!(actors = self.snapshots.len(), "watcher: system quiescent");
            for waiter in self.waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}

/// Run the watcher loop until every snapshot sender is gone.
pub(crate) async fn run_watcher(mut rx: mpsc::UnboundedReceiver<WatcherMessage>) {
    let mut state = WatcherState::new();
    while let Some(message) = rx.recv().await {
        state.handle(message);
    }
    tracing::trace!("watcher: all actors terminated, shutting down");
}
