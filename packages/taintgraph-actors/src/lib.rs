//! Mailbox actor runtime with distributed termination detection.
//!
//! # Overview
//!
//! Each actor owns an unbounded mailbox and processes messages one at a
//! time on an exclusive tokio task; mailboxes are the only synchronization
//! primitive exposed to actor code. The runtime provides:
//!
//! - `spawn` of named child actors (supervision by structured ownership),
//! - fire-and-forget `send` with per-sender/per-receiver ordering,
//! - `ask` request/response over a single-use reply channel,
//! - cooperative `stop`/`resume` that cascades through the ownership tree,
//! - quiescence detection through a dedicated watcher task that tallies
//!   per-actor `Snapshot`s (busy/idle status plus monotone sent/received
//!   counters).
//!
//! # Failure semantics
//!
//! An error returned from [`Actor::receive`] is delivered back to the actor
//! via [`Actor::on_failure`]; the actor then discards ordinary messages
//! until it is explicitly resumed. A failing actor still reports an idle
//! snapshot, so global termination detection keeps working even when an
//! actor is wedged.

mod actor;
mod error;
mod system;
mod watcher;

pub use actor::{Actor, ActorContext, ActorRef};
pub use error::{ActorError, Result};
pub use system::ActorSystem;
pub use watcher::{is_quiescent, ActorStatus, Snapshot};
