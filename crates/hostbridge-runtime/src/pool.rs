//! `FixedPool`: the default `WorkerPool` implementation.
//!
//! Spawns N OS threads at creation. Workers dequeue boxed jobs from a
//! bounded lock-free MPMC queue and run them; a job reports its own result
//! back to the runtime inbox. Idle workers park and are unparked on enqueue.
//!
//! No dynamic scaling. Simple, predictable, safe.

use hostbridge_core::error::{BridgeError, BridgeResult};
use hostbridge_core::worker::{Job, WorkerPool};
use hostbridge_core::{kdebug, kerror};

use crossbeam_queue::ArrayQueue;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Upper bound on pool size
pub const MAX_WORKERS: usize = 64;

/// Shared state between the runtime thread and workers.
struct PoolInner {
    /// Work queue: runtime → workers.
    work_queue: ArrayQueue<Job>,
    /// Number of workers currently running a job.
    active: AtomicUsize,
    /// Shutdown flag.
    shutdown: AtomicBool,
    /// Park duration when the queue is empty.
    idle_park: Duration,
    /// Round-robin cursor for unpark.
    next_wake: AtomicUsize,
}

pub struct FixedPool {
    inner: Arc<PoolInner>,
    handles: Vec<thread::JoinHandle<()>>,
    total: usize,
}

impl FixedPool {
    /// Create a pool with `n` workers.
    ///
    /// `queue_depth`: max pending jobs before enqueue fails.
    pub fn new(n: usize, queue_depth: usize, idle_park: Duration) -> BridgeResult<Self> {
        let n = n.clamp(1, MAX_WORKERS);
        let inner = Arc::new(PoolInner {
            work_queue: ArrayQueue::new(queue_depth.max(1)),
            active: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            idle_park,
            next_wake: AtomicUsize::new(0),
        });

        let mut pool = FixedPool {
            inner,
            handles: Vec::with_capacity(n),
            total: 0,
        };
        for worker_id in 0..n {
            let inner = Arc::clone(&pool.inner);
            let handle = thread::Builder::new()
                .name(format!("hostbridge-worker-{}", worker_id))
                .spawn(move || worker_loop(inner, worker_id));
            match handle {
                Ok(h) => {
                    pool.handles.push(h);
                    pool.total += 1;
                }
                Err(e) => {
                    kerror!("failed to spawn worker {}: {}", worker_id, e);
                    pool.shutdown();
                    return Err(BridgeError::from(e));
                }
            }
        }

        kdebug!("FixedPool started: {} workers, queue depth {}", n, queue_depth);
        Ok(pool)
    }

    /// Unpark workers round-robin; unparking a busy worker only sets its token.
    fn wake_one(&self) {
        if self.handles.is_empty() {
            return;
        }
        let i = self.inner.next_wake.fetch_add(1, Ordering::Relaxed) % self.handles.len();
        self.handles[i].thread().unpark();
    }
}

impl WorkerPool for FixedPool {
    fn enqueue(&self, job: Job) -> BridgeResult<()> {
        if self.inner.shutdown.load(Ordering::Relaxed) {
            return Err(BridgeError::WorkerUnavailable);
        }
        self.inner
            .work_queue
            .push(job)
            .map_err(|_| BridgeError::WorkerUnavailable)?;
        self.wake_one();
        Ok(())
    }

    fn active_workers(&self) -> usize {
        self.inner.active.load(Ordering::Relaxed)
    }

    fn total_workers(&self) -> usize {
        self.total
    }

    fn queued(&self) -> usize {
        self.inner.work_queue.len()
    }

    fn shutdown(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.inner.shutdown.store(true, Ordering::SeqCst);
        for h in &self.handles {
            h.thread().unpark();
        }
        for h in self.handles.drain(..) {
            if h.join().is_err() {
                kerror!("worker thread panicked outside a job");
            }
        }
        kdebug!("FixedPool joined");
    }
}

impl Drop for FixedPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker thread main loop.
///
/// On shutdown the queue is drained before exit so every accepted job runs.
fn worker_loop(inner: Arc<PoolInner>, worker_id: usize) {
    loop {
        match inner.work_queue.pop() {
            Some(job) => {
                inner.active.fetch_add(1, Ordering::Relaxed);
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    kerror!("worker {}: job panicked", worker_id);
                }
                inner.active.fetch_sub(1, Ordering::Relaxed);
            }
            None => {
                if inner.shutdown.load(Ordering::Acquire) {
                    break;
                }
                thread::park_timeout(inner.idle_park);
            }
        }
    }
}

// ============================================================================
// InlinePool
// ============================================================================

/// Runs every job synchronously inside `enqueue()`.
///
/// Deterministic ordering for tests; the runtime thread does the "worker"
/// side itself, so thread-identity checks on execute do not apply.
#[derive(Default)]
pub struct InlinePool {
    closed: bool,
}

impl InlinePool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkerPool for InlinePool {
    fn enqueue(&self, job: Job) -> BridgeResult<()> {
        if self.closed {
            return Err(BridgeError::WorkerUnavailable);
        }
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            kerror!("inline job panicked");
        }
        Ok(())
    }

    fn active_workers(&self) -> usize {
        0
    }

    fn total_workers(&self) -> usize {
        0
    }

    fn queued(&self) -> usize {
        0
    }

    fn shutdown(&mut self) {
        self.closed = true;
    }
}
