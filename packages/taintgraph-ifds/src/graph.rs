//! Application-graph contract implemented by language front ends.

/// Interprocedural program graph over a front end's method and statement
/// types. The engine depends on front ends only through this trait.
///
/// Methods return owned collections: implementations typically answer from
/// prebuilt indexes and the engine holds no borrows across await points.
pub trait ApplicationGraph<M, S>: Send + Sync
where
    S: PartialEq,
{
    fn predecessors(&self, stmt: &S) -> Vec<S>;

    fn successors(&self, stmt: &S) -> Vec<S>;

    /// Methods a call statement may dispatch to. Empty for non-calls and
    /// for calls the front end could not resolve.
    fn callees(&self, stmt: &S) -> Vec<M>;

    /// Call statements that may invoke `method`.
    fn callers(&self, method: &M) -> Vec<S>;

    fn entry_points(&self, method: &M) -> Vec<S>;

    fn exit_points(&self, method: &M) -> Vec<S>;

    fn method_of(&self, stmt: &S) -> M;

    /// Whether `stmt` is a call site. The default treats any statement
    /// with resolvable callees as a call; front ends that model calls to
    /// external methods (no resolvable body) should override this.
    fn is_call_site(&self, stmt: &S) -> bool {
        !self.callees(stmt).is_empty()
    }

    fn is_exit_point(&self, stmt: &S) -> bool {
        self.exit_points(&self.method_of(stmt)).contains(stmt)
    }
}
