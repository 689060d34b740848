//! Thread-safe functions: a channel from any thread into the runtime thread.
//!
//! A `ThreadSafeFunction<T>` is `Send + Sync + Clone`. Other threads `call()`
//! it with a `T`; the runtime thread later invokes the bound marshaling
//! closure with that `T`. The marshaling closure is `!Send` and stays in the
//! runtime's table.
//!
//! Lifetime is reference counted by thread: every thread using the function
//! holds one reference (`acquire`/`release`). When the count reaches zero the
//! function closes, remaining queued items are delivered, the marshaling
//! closure is dropped and the finalizer runs, all on the runtime thread.

use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use hostbridge_core::error::{BridgeError, BridgeResult};
use hostbridge_core::{kdebug, kerror, ktrace, InvocationId};

use crate::inbox::{Inbox, InboxEvent};
use crate::runtime::Env;

/// How `call()` behaves when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// Fail with `QueueFull`
    NonBlocking,
    /// Wait for space. Refused with `WrongThread` on the runtime thread.
    Blocking,
}

struct Lifecycle {
    threads: usize,
    closing: bool,
    aborted: bool,
}

struct TsfnShared<T> {
    id: InvocationId,
    name: String,
    queue: ArrayQueue<T>,
    life: Mutex<Lifecycle>,
    inbox: Arc<Inbox>,
    runtime_thread: ThreadId,
    idle_park: Duration,
}

impl<T> TsfnShared<T> {
    fn life(&self) -> MutexGuard<'_, Lifecycle> {
        self.life.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle usable from any thread
pub struct ThreadSafeFunction<T: Send + 'static> {
    shared: Arc<TsfnShared<T>>,
}

impl<T: Send + 'static> Clone for ThreadSafeFunction<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> ThreadSafeFunction<T> {
    pub fn id(&self) -> InvocationId {
        self.shared.id
    }

    /// Queue `data` for the marshaling closure.
    pub fn call(&self, data: T, mode: CallMode) -> BridgeResult<()> {
        let mut data = data;
        loop {
            {
                let life = self.shared.life();
                if life.closing {
                    return Err(BridgeError::Closing);
                }
                match self.shared.queue.push(data) {
                    Ok(()) => {
                        drop(life);
                        self.shared.inbox.post(InboxEvent::TsfnCall { id: self.shared.id });
                        return Ok(());
                    }
                    Err(back) => data = back,
                }
            }
            match mode {
                CallMode::NonBlocking => return Err(BridgeError::QueueFull),
                CallMode::Blocking => {
                    // Only the runtime thread drains the queue.
                    if thread::current().id() == self.shared.runtime_thread {
                        return Err(BridgeError::WrongThread);
                    }
                    thread::park_timeout(self.shared.idle_park);
                }
            }
        }
    }

    /// Take one more thread reference.
    pub fn acquire(&self) -> BridgeResult<()> {
        let mut life = self.shared.life();
        if life.closing {
            return Err(BridgeError::Closing);
        }
        life.threads += 1;
        Ok(())
    }

    /// Drop one thread reference. The last release closes the function.
    pub fn release(&self) -> BridgeResult<()> {
        let mut life = self.shared.life();
        if life.threads == 0 {
            return Err(BridgeError::Closing);
        }
        life.threads -= 1;
        if life.threads == 0 {
            life.closing = true;
            drop(life);
            ktrace!("{}: last reference released", self.shared.id);
            self.shared.inbox.post(InboxEvent::TsfnRelease { id: self.shared.id });
        }
        Ok(())
    }

    /// Close immediately. Queued items are dropped without being delivered.
    pub fn abort(&self) -> BridgeResult<()> {
        let mut life = self.shared.life();
        if life.closing {
            return Err(BridgeError::Closing);
        }
        life.closing = true;
        life.aborted = true;
        life.threads = 0;
        drop(life);
        kdebug!("{}: '{}' aborted", self.shared.id, self.shared.name);
        self.shared.inbox.post(InboxEvent::TsfnRelease { id: self.shared.id });
        Ok(())
    }

    pub fn thread_count(&self) -> usize {
        self.shared.life().threads
    }

    pub fn is_closing(&self) -> bool {
        self.shared.life().closing
    }

    /// Items queued but not yet delivered
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }
}

// ============================================================================
// Runtime side
// ============================================================================

/// Type-erased runtime half of a thread-safe function
pub(crate) trait TsfnDispatch {
    /// Deliver one queued item, if any.
    fn dispatch_one(&self, env: &Env);
    /// Deliver what is left, then drop the marshaling closure and finalize.
    fn finalize(&self, env: &Env);
    /// Refuse further calls. Callers waiting in `Blocking` mode return
    /// `Closing`; items already queued stay deliverable.
    fn close(&self);
    /// Drop queued items and finalize.
    fn abort(&self, env: &Env);
}

type CallJs<T> = Box<dyn FnMut(&Env, T)>;
type Finalizer = Box<dyn FnOnce(&Env)>;

struct TsfnSlot<T> {
    shared: Arc<TsfnShared<T>>,
    call_js: RefCell<Option<CallJs<T>>>,
    finalizer: RefCell<Option<Finalizer>>,
}

impl<T> TsfnSlot<T> {
    fn deliver(&self, env: &Env, item: T) {
        match self.call_js.try_borrow_mut() {
            Ok(mut guard) => match guard.as_mut() {
                Some(call_js) => call_js(env, item),
                None => ktrace!("{}: item after finalize dropped", self.shared.id),
            },
            Err(_) => kerror!(
                "{}: '{}' re-entered from its own marshaling closure; item dropped",
                self.shared.id,
                self.shared.name
            ),
        }
    }

    fn run_finalizer(&self, env: &Env) {
        self.call_js.borrow_mut().take();
        let finalizer = self.finalizer.borrow_mut().take();
        if let Some(finalizer) = finalizer {
            finalizer(env);
        }
        kdebug!("{}: '{}' finalized", self.shared.id, self.shared.name);
    }
}

impl<T> TsfnDispatch for TsfnSlot<T> {
    fn dispatch_one(&self, env: &Env) {
        debug_assert!(env.is_runtime_thread());
        if self.shared.life().aborted {
            return;
        }
        if let Some(item) = self.shared.queue.pop() {
            self.deliver(env, item);
        }
    }

    fn finalize(&self, env: &Env) {
        debug_assert!(env.is_runtime_thread());
        let aborted = self.shared.life().aborted;
        while let Some(item) = self.shared.queue.pop() {
            if !aborted {
                self.deliver(env, item);
            }
        }
        self.run_finalizer(env);
    }

    fn close(&self) {
        self.shared.life().closing = true;
    }

    fn abort(&self, env: &Env) {
        {
            let mut life = self.shared.life();
            life.closing = true;
            life.aborted = true;
        }
        while self.shared.queue.pop().is_some() {}
        self.run_finalizer(env);
    }
}

impl Env {
    /// Create a thread-safe function bound to `call_js`.
    ///
    /// `max_queue_size == 0` uses the configured default depth.
    /// `initial_thread_count` references are held by the creator.
    pub fn create_threadsafe_function<T, F>(
        &self,
        name: &str,
        max_queue_size: usize,
        initial_thread_count: usize,
        call_js: F,
    ) -> BridgeResult<ThreadSafeFunction<T>>
    where
        T: Send + 'static,
        F: FnMut(&Env, T) + 'static,
    {
        self.create_threadsafe_function_with_finalizer(
            name,
            max_queue_size,
            initial_thread_count,
            call_js,
            |_| {},
        )
    }

    /// Like `create_threadsafe_function`, with a finalizer that runs once on
    /// the runtime thread after the marshaling closure is dropped.
    pub fn create_threadsafe_function_with_finalizer<T, F, Z>(
        &self,
        name: &str,
        max_queue_size: usize,
        initial_thread_count: usize,
        call_js: F,
        finalizer: Z,
    ) -> BridgeResult<ThreadSafeFunction<T>>
    where
        T: Send + 'static,
        F: FnMut(&Env, T) + 'static,
        Z: FnOnce(&Env) + 'static,
    {
        self.check_thread()?;
        if self.is_closing() {
            return Err(BridgeError::Closing);
        }
        if initial_thread_count == 0 {
            return Err(BridgeError::InvalidArgument {
                index: 2,
                expected: "an initial thread count of at least 1",
            });
        }

        let capacity = if max_queue_size == 0 {
            self.config().tsfn_queue_size
        } else {
            max_queue_size
        };
        let id = InvocationId::next();
        let shared = Arc::new(TsfnShared {
            id,
            name: name.to_string(),
            queue: ArrayQueue::new(capacity),
            life: Mutex::new(Lifecycle {
                threads: initial_thread_count,
                closing: false,
                aborted: false,
            }),
            inbox: Arc::clone(&self.inner.inbox),
            runtime_thread: self.runtime_thread(),
            idle_park: self.config().idle_park,
        });

        let slot = TsfnSlot {
            shared: Arc::clone(&shared),
            call_js: RefCell::new(Some(Box::new(call_js) as CallJs<T>)),
            finalizer: RefCell::new(Some(Box::new(finalizer) as Finalizer)),
        };
        self.inner.tsfns.borrow_mut().insert(id, std::rc::Rc::new(slot));
        ktrace!("{}: thread-safe function '{}' created (queue {})", id, name, capacity);

        Ok(ThreadSafeFunction { shared })
    }
}
