//! Error types for the IFDS engine.
//!
//! Configuration problems fail fast; under-approximation outcomes
//! (unresolved positions, calls without resolved callees) are not errors
//! and never surface here.

use taintgraph_actors::ActorError;
use thiserror::Error;

/// Main error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid engine or rule configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A message referenced a runner id that was never registered.
    #[error("unknown runner id: {0}")]
    UnknownRunner(String),

    /// A condition kind that must be expanded by the configuration loader
    /// reached the evaluator.
    #[error("unexpanded condition kind: {0}")]
    UnexpandedCondition(String),

    /// Trace reconstruction hit a reason variant it cannot expand.
    #[error("trace reconstruction not supported: {0}")]
    UnsupportedTrace(String),

    /// Failure inside the actor runtime.
    #[error(transparent)]
    Actor(#[from] ActorError),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
