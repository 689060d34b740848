//! Completion inbox: workers → runtime thread.
//!
//! Everything a worker hands back is a `Send` event pushed onto a lock-free
//! queue, followed by one wakeup. Continuations never travel through here;
//! events carry only an `InvocationId` and owned output.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_queue::SegQueue;
use hostbridge_core::error::BridgeResult;
use hostbridge_core::{kwarn, InvocationId, Notifier};

use crate::wakeup::{new_wakeup, PlatformWakeup, Wakeup};

pub(crate) enum InboxEvent {
    /// Async work finished its execute step; `output` is a boxed `BridgeResult<T>`
    WorkDone {
        id: InvocationId,
        output: Box<dyn Any + Send>,
    },
    /// A thread-safe function has one more queued call
    TsfnCall { id: InvocationId },
    /// A thread-safe function's thread count reached zero, or it was aborted
    TsfnRelease { id: InvocationId },
    /// A tracked thread returned
    ThreadExited { id: InvocationId },
}

pub(crate) struct Inbox {
    queue: SegQueue<InboxEvent>,
    wakeup: PlatformWakeup,
    closing: AtomicBool,
}

impl Inbox {
    pub(crate) fn new() -> BridgeResult<Self> {
        Ok(Self {
            queue: SegQueue::new(),
            wakeup: new_wakeup()?,
            closing: AtomicBool::new(false),
        })
    }

    /// Push an event and wake the runtime thread. Never blocks.
    pub(crate) fn post(&self, event: InboxEvent) {
        self.queue.push(event);
        if let Err(e) = self.wakeup.notify() {
            kwarn!("inbox wakeup failed: {}", e);
        }
    }

    pub(crate) fn pop(&self) -> Option<InboxEvent> {
        self.queue.pop()
    }

    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        self.wakeup.wait(Some(timeout))
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    pub(crate) fn set_closing(&self) {
        self.closing.store(true, Ordering::Release);
    }
}
