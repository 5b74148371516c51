//! Concurrent IFDS tabulation engine.
//!
//! # Overview
//!
//! An interprocedural dataflow solver in the IFDS style, parallelized
//! over an actor runtime: the application graph is partitioned into
//! chunks, each (chunk, analysis) pair gets its own runner actor owning
//! the path edges of its statements, and callee summaries flow between
//! chunks through a subscription protocol. Quiescence of the actor
//! system is the fixed point.
//!
//! Front ends plug in through [`ApplicationGraph`] and an [`Analyzer`];
//! the [`taint`] module ships a rule-driven forward taint analyzer.
//!
//! ```ignore
//! let system = IfdsSystem::new("taint", context);
//! system.start_analysis(&runner, &entry_method)?;
//! system.run_analysis(Some(Duration::from_secs(60))).await;
//! let data = system.collect_computation_data().await?;
//! ```

mod adapter;
mod analyzer;
mod chunk;
mod context;
mod domain;
mod errors;
mod graph;
mod messages;
mod result;
mod router;
mod runner;
mod system;
mod trace;

pub mod taint;

pub use analyzer::{Analyzer, AnalyzerEvent, FlowFunctions};
pub use chunk::{ChunkStrategy, MethodChunkStrategy, SingletonChunkStrategy};
pub use context::{IfdsContext, RunnerSpec};
pub use domain::{Chunk, Edge, Fact, Finding, Method, Reason, RunnerId, Stmt, Vertex};
pub use errors::{EngineError, Result};
pub use graph::ApplicationGraph;
pub use messages::{CollectHandle, EngineMessage, RunnerMessage};
pub use result::{merge_computation_data, IfdsComputationData};
pub use system::IfdsSystem;
pub use trace::{AllTraces, TraceGraph};
