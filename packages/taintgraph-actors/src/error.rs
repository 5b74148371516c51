//! Error types for the actor runtime.

use thiserror::Error;

/// Errors surfaced by the actor runtime.
#[derive(Debug, Error)]
pub enum ActorError {
    /// A message handler failed while processing a user message.
    /// The owning actor pauses until it is resumed.
    #[error("actor handler failed: {0}")]
    Handler(String),

    /// The reply channel of an `ask` was dropped before a response arrived,
    /// usually because the responding actor failed or was stopped.
    #[error("ask was canceled before a reply arrived")]
    AskCanceled,
}

impl ActorError {
    /// Create a handler error from any displayable payload.
    pub fn handler(msg: impl Into<String>) -> Self {
        ActorError::Handler(msg.into())
    }
}

/// Result type alias for actor operations.
pub type Result<T> = std::result::Result<T, ActorError>;
