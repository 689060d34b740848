//! The single-threaded host runtime
//!
//! Orchestrates all components: worker pool, completion inbox, thread-safe
//! functions, tracked threads, event loop.
//!
//! `Runtime` owns the runtime's logical thread: it is created there, it is
//! `!Send`, and every delivery into managed code happens inside
//! `run()`/`run_once()` on that thread. Native entry points receive an `Env`,
//! a cheap clone of the same state.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use hostbridge_core::error::{BridgeError, BridgeResult};
use hostbridge_core::worker::WorkerPool;
use hostbridge_core::{kdebug, kerror, kinfo, ktrace, kwarn, InvocationId};

use crate::async_work::PendingWork;
use crate::config::RuntimeConfig;
use crate::event_loop::EventLoop;
use crate::inbox::{Inbox, InboxEvent};
use crate::pool::FixedPool;
use crate::scope::HandleScope;
use crate::tsfn::TsfnDispatch;

pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    /// The runtime's logical thread
    pub(crate) thread: ThreadId,
    pub(crate) pool: RefCell<Box<dyn WorkerPool>>,
    pub(crate) inbox: Arc<Inbox>,
    /// Async work waiting for its completion step
    pub(crate) works: RefCell<HashMap<InvocationId, PendingWork>>,
    /// Live thread-safe functions
    pub(crate) tsfns: RefCell<HashMap<InvocationId, Rc<dyn TsfnDispatch>>>,
    /// Threads started through `spawn_thread`, joined on exit
    threads: RefCell<HashMap<InvocationId, JoinHandle<()>>>,
    pub(crate) scope_depth: Cell<usize>,
    closing: Cell<bool>,
    event_loop: EventLoop,
}

/// Handle to the runtime passed to native entry points
///
/// Clones share state. `!Send`: an `Env` only exists on the runtime thread.
#[derive(Clone)]
pub struct Env {
    pub(crate) inner: Rc<RuntimeInner>,
}

/// Non-owning `Env`, for closures stored inside the runtime itself
#[derive(Clone)]
pub struct WeakEnv {
    inner: Weak<RuntimeInner>,
}

impl WeakEnv {
    /// `None` once the runtime is gone
    pub fn upgrade(&self) -> Option<Env> {
        self.inner.upgrade().map(|inner| Env { inner })
    }
}

impl Env {
    pub fn downgrade(&self) -> WeakEnv {
        WeakEnv {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Thread the runtime was created on
    pub fn runtime_thread(&self) -> ThreadId {
        self.inner.thread
    }

    pub fn is_runtime_thread(&self) -> bool {
        thread::current().id() == self.inner.thread
    }

    /// `Err(WrongThread)` unless called on the runtime thread
    pub fn check_thread(&self) -> BridgeResult<()> {
        if self.is_runtime_thread() {
            Ok(())
        } else {
            Err(BridgeError::WrongThread)
        }
    }

    /// True once `begin_shutdown()` or `Runtime::shutdown()` ran
    pub fn is_closing(&self) -> bool {
        self.inner.closing.get()
    }

    /// Stop accepting new work and refuse new handle scopes.
    ///
    /// Outstanding work still completes and is delivered.
    pub fn begin_shutdown(&self) {
        if !self.inner.closing.replace(true) {
            self.inner.inbox.set_closing();
            kinfo!("runtime closing");
        }
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.inner.event_loop
    }

    /// Open a scope in which managed code may be invoked.
    ///
    /// Fails with `ScopeUnavailable` while the runtime is closing and with
    /// `WrongThread` off the runtime thread.
    pub fn open_handle_scope(&self) -> BridgeResult<HandleScope<'_>> {
        self.check_thread()?;
        if self.is_closing() {
            return Err(BridgeError::ScopeUnavailable);
        }
        Ok(HandleScope::enter(self))
    }

    /// Start an OS thread the runtime tracks and joins.
    ///
    /// `run()` does not return while the thread is alive. A panic in `f` is
    /// caught and logged.
    pub fn spawn_thread<F>(&self, name: &str, f: F) -> BridgeResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_closing() {
            return Err(BridgeError::Closing);
        }
        let id = InvocationId::next();
        let inbox = Arc::clone(&self.inner.inbox);
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(format!("hostbridge-{}", name))
            .spawn(move || {
                if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
                    kerror!("thread '{}' panicked", thread_name);
                }
                inbox.post(InboxEvent::ThreadExited { id });
            })?;
        self.inner.threads.borrow_mut().insert(id, handle);
        ktrace!("{}: spawned thread '{}'", id, name);
        Ok(())
    }

    /// Async work, thread-safe functions and tracked threads not yet finished
    pub fn outstanding(&self) -> usize {
        self.inner.works.borrow().len()
            + self.inner.tsfns.borrow().len()
            + self.inner.threads.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding() == 0 && self.inner.inbox.len() == 0
    }

    /// Process everything currently in the inbox without blocking.
    ///
    /// Returns the number of events handled.
    pub fn run_once(&self) -> usize {
        debug_assert!(self.is_runtime_thread(), "delivery off the runtime thread");
        let mut handled = 0;
        while let Some(event) = self.inner.inbox.pop() {
            self.dispatch(event);
            handled += 1;
        }
        handled
    }

    /// Deliver until nothing is outstanding.
    pub fn run(&self) {
        loop {
            let handled = self.run_once();
            if self.is_idle() {
                break;
            }
            if handled == 0 {
                self.inner.inbox.wait(self.inner.config.run_wait);
            }
        }
    }

    fn dispatch(&self, event: InboxEvent) {
        match event {
            InboxEvent::WorkDone { id, output } => {
                let pending = self.inner.works.borrow_mut().remove(&id);
                match pending {
                    Some(work) => work.deliver(self, output),
                    None => kwarn!("{}: completion for unknown work", id),
                }
            }
            InboxEvent::TsfnCall { id } => {
                let slot = self.inner.tsfns.borrow().get(&id).cloned();
                match slot {
                    Some(slot) => slot.dispatch_one(self),
                    None => ktrace!("{}: call after finalize ignored", id),
                }
            }
            InboxEvent::TsfnRelease { id } => {
                let slot = self.inner.tsfns.borrow_mut().remove(&id);
                if let Some(slot) = slot {
                    slot.finalize(self);
                }
            }
            InboxEvent::ThreadExited { id } => {
                let handle = self.inner.threads.borrow_mut().remove(&id);
                if let Some(handle) = handle {
                    if handle.join().is_err() {
                        kerror!("{}: tracked thread join failed", id);
                    }
                }
            }
        }
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Owner of the runtime thread
pub struct Runtime {
    env: Env,
    shut_down: bool,
}

impl Runtime {
    /// Create a runtime on the current thread with a `FixedPool`.
    pub fn new(config: RuntimeConfig) -> BridgeResult<Self> {
        config.validate()?;
        let pool = FixedPool::new(config.num_workers, config.queue_depth, config.idle_park)?;
        Self::with_pool(config, Box::new(pool))
    }

    /// Create a runtime with configuration from the environment.
    pub fn from_env() -> BridgeResult<Self> {
        Self::new(RuntimeConfig::from_env())
    }

    /// Create a runtime over a caller-supplied pool.
    pub fn with_pool(config: RuntimeConfig, pool: Box<dyn WorkerPool>) -> BridgeResult<Self> {
        config.validate()?;
        config.log();
        let inner = RuntimeInner {
            thread: thread::current().id(),
            pool: RefCell::new(pool),
            inbox: Arc::new(crate::inbox::Inbox::new()?),
            works: RefCell::new(HashMap::new()),
            tsfns: RefCell::new(HashMap::new()),
            threads: RefCell::new(HashMap::new()),
            scope_depth: Cell::new(0),
            closing: Cell::new(false),
            event_loop: EventLoop::new()?,
            config,
        };
        kdebug!("runtime created on {:?}", inner.thread);
        Ok(Self {
            env: Env {
                inner: Rc::new(inner),
            },
            shut_down: false,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn run_once(&self) -> usize {
        self.env.run_once()
    }

    pub fn run(&self) {
        self.env.run()
    }

    /// Stop accepting work, let workers and tracked threads finish, and
    /// deliver what they produced.
    ///
    /// Thread-safe functions still holding references are aborted: their
    /// queued calls are dropped and their finalizers run.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.env.begin_shutdown();

        // Tracked threads blocked in a call must not outlive the join below.
        for slot in self.env.inner.tsfns.borrow().values() {
            slot.close();
        }

        self.env.inner.pool.borrow_mut().shutdown();

        let threads: Vec<_> = self.env.inner.threads.borrow_mut().drain().collect();
        for (id, handle) in threads {
            if handle.join().is_err() {
                kerror!("{}: tracked thread join failed", id);
            }
        }

        self.env.run_once();

        let tsfns: Vec<_> = self.env.inner.tsfns.borrow_mut().drain().collect();
        for (id, slot) in tsfns {
            kdebug!("{}: aborting thread-safe function at shutdown", id);
            slot.abort(&self.env);
        }

        let leftover = self.env.inner.works.borrow().len();
        if leftover > 0 {
            kwarn!("{} async work items never completed", leftover);
            self.env.inner.works.borrow_mut().clear();
        }
        kinfo!("runtime shut down");
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn test_config() -> RuntimeConfig {
        RuntimeConfig::new()
            .num_workers(2)
            .idle_park(Duration::from_micros(200))
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert!(matches!(
            Runtime::new(RuntimeConfig::new().num_workers(0)),
            Err(BridgeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_runtime_thread_identity() {
        let rt = Runtime::new(test_config()).unwrap();
        assert!(rt.env().is_runtime_thread());
        assert!(rt.env().check_thread().is_ok());
        assert_eq!(rt.env().runtime_thread(), thread::current().id());
    }

    #[test]
    fn test_run_waits_for_tracked_thread() {
        let rt = Runtime::new(test_config()).unwrap();
        let done = Arc::new(AtomicBool::new(false));
        let d = Arc::clone(&done);
        rt.env()
            .spawn_thread("sleeper", move || {
                thread::sleep(Duration::from_millis(30));
                d.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(rt.env().outstanding(), 1);

        rt.run();
        assert!(done.load(Ordering::SeqCst));
        assert!(rt.env().is_idle());
    }

    #[test]
    fn test_run_returns_immediately_when_idle() {
        let rt = Runtime::new(test_config()).unwrap();
        rt.run();
        assert_eq!(rt.run_once(), 0);
    }

    #[test]
    fn test_closing_refuses_scope_and_threads() {
        let rt = Runtime::new(test_config()).unwrap();
        {
            let scope = rt.env().open_handle_scope().unwrap();
            assert_eq!(scope.depth(), 1);
        }
        rt.env().begin_shutdown();
        assert!(rt.env().is_closing());
        assert!(matches!(
            rt.env().open_handle_scope(),
            Err(BridgeError::ScopeUnavailable)
        ));
        assert_eq!(
            rt.env().spawn_thread("late", || {}),
            Err(BridgeError::Closing)
        );
    }

    #[test]
    fn test_shutdown_joins_tracked_threads() {
        let mut rt = Runtime::new(test_config()).unwrap();
        let done = Arc::new(AtomicBool::new(false));
        let d = Arc::clone(&done);
        rt.env()
            .spawn_thread("joined", move || {
                thread::sleep(Duration::from_millis(20));
                d.store(true, Ordering::SeqCst);
            })
            .unwrap();
        rt.shutdown();
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(rt.env().outstanding(), 0);
    }

    #[test]
    fn test_panicking_thread_is_still_joined() {
        let rt = Runtime::new(test_config()).unwrap();
        rt.env().spawn_thread("boom", || panic!("boom")).unwrap();
        rt.run();
        assert!(rt.env().is_idle());
    }
}
