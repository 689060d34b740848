//! Event loop with async signal handles
//!
//! An `AsyncHandle` binds a handler to the loop; its `AsyncSender` may be
//! moved to any thread and `send()` wakes the loop, which runs the handler on
//! the loop's own thread. Sends that arrive before the handler runs collapse
//! into one call.
//!
//! `close()` from inside a handler takes effect after the handler returns.
//! `run(RunMode::Default)` returns once no handle is active.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use hostbridge_core::error::{BridgeError, BridgeResult};
use hostbridge_core::{kerror, ktrace, kwarn, Notifier};

use crate::wakeup::{new_wakeup, PlatformWakeup, Wakeup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Block until no handle is active
    Default,
    /// Handle what is pending, then return
    NoWait,
}

/// Cross-thread half of the loop
struct LoopShared {
    signals: SegQueue<u64>,
    wakeup: PlatformWakeup,
}

struct SignalFlags {
    pending: AtomicBool,
    closed: AtomicBool,
}

type Handler = Box<dyn FnMut(&AsyncHandle)>;

struct HandleSlot {
    flags: Arc<SignalFlags>,
    handler: RefCell<Handler>,
    on_close: RefCell<Option<Box<dyn FnOnce()>>>,
}

struct LoopInner {
    shared: Arc<LoopShared>,
    handles: RefCell<HashMap<u64, Rc<HandleSlot>>>,
    closing: RefCell<Vec<u64>>,
    next_id: Cell<u64>,
}

pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    pub fn new() -> BridgeResult<Self> {
        Ok(Self {
            inner: Rc::new(LoopInner {
                shared: Arc::new(LoopShared {
                    signals: SegQueue::new(),
                    wakeup: new_wakeup()?,
                }),
                handles: RefCell::new(HashMap::new()),
                closing: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
            }),
        })
    }

    /// Register an async handle. The loop stays alive until it is closed.
    pub fn async_init<F>(&self, handler: F) -> AsyncHandle
    where
        F: FnMut(&AsyncHandle) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let flags = Arc::new(SignalFlags {
            pending: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        let slot = HandleSlot {
            flags: Arc::clone(&flags),
            handler: RefCell::new(Box::new(handler)),
            on_close: RefCell::new(None),
        };
        self.inner.handles.borrow_mut().insert(id, Rc::new(slot));
        ktrace!("event loop: handle {} initialized", id);
        AsyncHandle {
            id,
            lp: Rc::downgrade(&self.inner),
            flags,
            shared: Arc::clone(&self.inner.shared),
        }
    }

    /// Handles registered and not yet closed
    pub fn active_handles(&self) -> usize {
        self.inner.handles.borrow().len()
    }

    /// Run the loop. Returns `true` if handles are still active.
    pub fn run(&self, mode: RunMode) -> bool {
        loop {
            self.process_signals();
            self.process_closing();
            if self.active_handles() == 0 {
                return false;
            }
            if mode == RunMode::NoWait {
                return true;
            }
            self.inner.shared.wakeup.wait(None);
        }
    }

    fn process_signals(&self) {
        while let Some(id) = self.inner.shared.signals.pop() {
            let slot = self.inner.handles.borrow().get(&id).cloned();
            let Some(slot) = slot else {
                continue;
            };
            if slot.flags.closed.load(Ordering::Acquire) {
                continue;
            }
            // Sends from here on schedule another call.
            slot.flags.pending.store(false, Ordering::Release);
            let handle = AsyncHandle {
                id,
                lp: Rc::downgrade(&self.inner),
                flags: Arc::clone(&slot.flags),
                shared: Arc::clone(&self.inner.shared),
            };
            match slot.handler.try_borrow_mut() {
                Ok(mut handler) => handler(&handle),
                Err(_) => kerror!("event loop: handle {} re-entered its own handler", id),
            };
        }
    }

    fn process_closing(&self) {
        let closing: Vec<u64> = self.inner.closing.borrow_mut().drain(..).collect();
        for id in closing {
            let slot = self.inner.handles.borrow_mut().remove(&id);
            if let Some(slot) = slot {
                let on_close = slot.on_close.borrow_mut().take();
                if let Some(on_close) = on_close {
                    on_close();
                }
                ktrace!("event loop: handle {} closed", id);
            }
        }
    }
}

/// Loop-thread view of an async handle
#[derive(Clone)]
pub struct AsyncHandle {
    id: u64,
    lp: Weak<LoopInner>,
    flags: Arc<SignalFlags>,
    shared: Arc<LoopShared>,
}

impl AsyncHandle {
    /// Sender for other threads
    pub fn sender(&self) -> AsyncSender {
        AsyncSender {
            id: self.id,
            flags: Arc::clone(&self.flags),
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_closing(&self) -> bool {
        self.flags.closed.load(Ordering::Acquire)
    }

    /// Close the handle; it stops counting as active on the next loop turn.
    pub fn close(&self) {
        self.close_inner(None);
    }

    /// Close and run `on_close` once the handle is gone.
    pub fn close_with<F: FnOnce() + 'static>(&self, on_close: F) {
        self.close_inner(Some(Box::new(on_close)));
    }

    fn close_inner(&self, on_close: Option<Box<dyn FnOnce()>>) {
        if self.flags.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(lp) = self.lp.upgrade() else {
            return;
        };
        if let Some(on_close) = on_close {
            if let Some(slot) = lp.handles.borrow().get(&self.id) {
                *slot.on_close.borrow_mut() = Some(on_close);
            }
        }
        lp.closing.borrow_mut().push(self.id);
        // Make a loop blocked in `run` notice the close.
        if let Err(e) = lp.shared.wakeup.notify() {
            kwarn!("event loop wakeup failed: {}", e);
        }
    }
}

/// `Send` half of an async handle
#[derive(Clone)]
pub struct AsyncSender {
    id: u64,
    flags: Arc<SignalFlags>,
    shared: Arc<LoopShared>,
}

impl AsyncSender {
    /// Wake the loop and schedule the handler. Never blocks.
    pub fn send(&self) -> BridgeResult<()> {
        if self.flags.closed.load(Ordering::Acquire) {
            return Err(BridgeError::Closing);
        }
        if self.flags.pending.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.shared.signals.push(self.id);
        self.shared.wakeup.notify()
    }
}
