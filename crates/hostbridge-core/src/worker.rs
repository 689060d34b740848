//! Worker pool abstraction.
//!
//! A `WorkerPool` runs the execute step of queued async work off the
//! runtime thread. Workers may block on I/O; that is the point.
//!
//! # Implementors
//!
//! - `FixedPool` (default): N OS threads over a bounded lock-free queue.
//! - `InlinePool` (testing): runs the job synchronously in the caller.

use crate::error::BridgeResult;

/// A unit of work for the pool. Owns everything it touches.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs on a pool of threads.
///
/// **Contract:**
/// - `enqueue()` must NEVER block. A full queue returns
///   `Err(WorkerUnavailable)`.
/// - Each accepted job runs exactly once, unless the pool is dropped
///   without `shutdown()`.
/// - `shutdown()` stops accepting work, lets queued jobs finish and joins
///   every worker thread.
pub trait WorkerPool {
    /// Queue a job for execution on a worker thread.
    fn enqueue(&self, job: Job) -> BridgeResult<()>;

    /// Number of workers currently running a job.
    fn active_workers(&self) -> usize;

    /// Total number of workers.
    fn total_workers(&self) -> usize;

    /// Jobs accepted but not yet picked up.
    fn queued(&self) -> usize;

    /// Stop accepting work, drain, and join.
    fn shutdown(&mut self);
}
