//! Core domain types of the tabulation algorithm.
//!
//! Vertices, edges and reasons are immutable values created by runner
//! actors as they process messages; they are accumulated append-only and
//! never mutated afterwards.

use std::fmt;
use std::hash::Hash;

/// Bound alias for statement types: engine state lives in hash tables and
/// crosses actor mailboxes, so statements must be cheap value types.
pub trait Stmt: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}
impl<T> Stmt for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Bound alias for method types.
pub trait Method: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}
impl<T> Method for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Bound alias for dataflow fact types.
pub trait Fact: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}
impl<T> Fact for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Bound alias for analysis findings.
pub trait Finding: Clone + fmt::Debug + Send + Sync + 'static {}
impl<T> Finding for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// A program point paired with an abstract dataflow fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vertex<S, F> {
    pub stmt: S,
    pub fact: F,
}

impl<S, F> Vertex<S, F> {
    pub fn new(stmt: S, fact: F) -> Self {
        Vertex { stmt, fact }
    }
}

/// A discovered path edge of the tabulation algorithm.
///
/// An edge whose endpoints coincide is the method-entry start marker
/// seeded when a callee's analysis begins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge<S, F> {
    pub from: Vertex<S, F>,
    pub to: Vertex<S, F>,
}

impl<S: PartialEq, F: PartialEq> Edge<S, F> {
    pub fn new(from: Vertex<S, F>, to: Vertex<S, F>) -> Self {
        Edge { from, to }
    }

    /// Method-entry self edge.
    pub fn is_start_marker(&self) -> bool {
        self.from == self.to
    }
}

/// Why an edge was derived. Reasons are diagnostic only: propagation
/// correctness never depends on them, but trace reconstruction walks them
/// backwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reason<S, F> {
    /// Seed fact injected by the caller.
    Initial,
    /// Straight-line flow from a predecessor edge.
    Sequent { edge: Edge<S, F> },
    /// Call-site skip over a call.
    CallToReturn { edge: Edge<S, F> },
    /// Entering a callee from a call site.
    CallToStart { caller_edge: Edge<S, F> },
    /// A callee summary composed back into the caller.
    ExitToReturnSite {
        summary_edge: Edge<S, F>,
        caller_edge: Edge<S, F>,
    },
    /// Injected by a coexisting runner (e.g. backward from forward).
    FromOtherRunner { edge: Edge<S, F>, other: RunnerId },
}

/// Identifies a logical analysis instance (e.g. forward taint) that may
/// share a chunk with other runners without mixing state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunnerId(String);

impl RunnerId {
    pub fn new(name: impl Into<String>) -> Self {
        RunnerId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque scheduling partition key. Chunking decides actor placement only;
/// it never affects analysis results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chunk(String);

impl Chunk {
    pub fn new(key: impl Into<String>) -> Self {
        Chunk(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
