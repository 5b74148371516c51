//! Chunk strategies: how methods are partitioned into schedulable units.
//!
//! A chunk strategy must map every statement of one method to the same
//! chunk (method granularity or coarser), so that a method's exit edges
//! and start subscriptions live in the same runner actor. Chunking is a
//! scheduling concern only: finer or coarser strategies change
//! parallelism, never the merged computation data.

use std::fmt;

use crate::domain::Chunk;

pub trait ChunkStrategy<M>: Send + Sync {
    fn chunk_of(&self, method: &M) -> Chunk;
}

/// Everything in one chunk: fully sequential, useful as the reference
/// schedule when validating chunk invariance.
pub struct SingletonChunkStrategy;

impl<M> ChunkStrategy<M> for SingletonChunkStrategy {
    fn chunk_of(&self, _method: &M) -> Chunk {
        Chunk::new("all")
    }
}

/// One chunk per method: the finest legal granularity.
pub struct MethodChunkStrategy;

impl<M: fmt::Debug> ChunkStrategy<M> for MethodChunkStrategy {
    fn chunk_of(&self, method: &M) -> Chunk {
        Chunk::new(format!("{method:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_maps_everything_together() {
        let strategy = SingletonChunkStrategy;
        assert_eq!(strategy.chunk_of(&"a"), strategy.chunk_of(&"b"));
    }

    #[test]
    fn method_strategy_separates_methods() {
        let strategy = MethodChunkStrategy;
        assert_ne!(strategy.chunk_of(&"a"), strategy.chunk_of(&"b"));
        assert_eq!(strategy.chunk_of(&"a"), strategy.chunk_of(&"a"));
    }
}
