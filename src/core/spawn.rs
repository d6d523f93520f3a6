//! Runtime seam: how the scheduler puts a dispatched task on an execution context.

use std::future::Future;

/// Abstraction for spawning task execution on a runtime.
///
/// The scheduler never runs an operation on the submitter's own context; every
/// dispatch goes through `spawn`. Implementations must not poll `fut` inline.
pub trait Spawn: Send + Sync + 'static {
    /// Spawn a future to run to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
