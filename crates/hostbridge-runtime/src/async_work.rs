//! Async work: execute on a pool worker, complete on the runtime thread.
//!
//! ```text
//!   Submitted ──► Executing ──► Completed ──► Delivered
//!       │
//!       └──(cancel before execute)──► Cancelled ──► (delivered as Err(Cancelled))
//! ```
//!
//! The execute closure is `Send` and owns its inputs. The complete closure
//! is `!Send`, may hold continuations, and never leaves the runtime thread:
//! it waits in the runtime's work table keyed by `InvocationId` until the
//! worker's result arrives through the inbox.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use hostbridge_core::error::{BridgeError, BridgeResult};
use hostbridge_core::{kdebug, ktrace, CancellationToken, InvocationId};

use crate::inbox::InboxEvent;
use crate::runtime::Env;

/// Lifecycle of one async work item
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkState {
    Submitted = 0,
    Executing = 1,
    Completed = 2,
    Delivered = 3,
    Cancelled = 4,
}

impl WorkState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkState::Submitted,
            1 => WorkState::Executing,
            2 => WorkState::Completed,
            3 => WorkState::Delivered,
            _ => WorkState::Cancelled,
        }
    }
}

type CompleteFn = Box<dyn FnOnce(&Env, Box<dyn Any + Send>)>;

/// Runtime-side half of a queued work item
pub(crate) struct PendingWork {
    name: String,
    state: Arc<AtomicU8>,
    complete: CompleteFn,
}

impl PendingWork {
    pub(crate) fn deliver(self, env: &Env, output: Box<dyn Any + Send>) {
        debug_assert!(env.is_runtime_thread());
        ktrace!("work '{}' delivering", self.name);
        (self.complete)(env, output);
        // Cancelled stays Cancelled.
        let _ = self.state.compare_exchange(
            WorkState::Completed as u8,
            WorkState::Delivered as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Caller's view of a queued work item
#[derive(Clone)]
pub struct WorkHandle {
    id: InvocationId,
    state: Arc<AtomicU8>,
    token: CancellationToken,
}

impl WorkHandle {
    pub fn id(&self) -> InvocationId {
        self.id
    }

    pub fn state(&self) -> WorkState {
        WorkState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Request cancellation.
    ///
    /// Effective only before the execute step starts; the completion still
    /// runs, with `Err(Cancelled)`. A running execute step may poll the token.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Env {
    /// Queue `execute` on the worker pool and `complete` on this runtime.
    ///
    /// `complete` runs exactly once, on the runtime thread, with the execute
    /// result, `Err(Cancelled)`, or `Err(CallFailed)` if execute panicked.
    /// Fails with `Closing` once the runtime is shutting down and with
    /// `WorkerUnavailable` when the pool queue is full; `complete` is then
    /// dropped without running.
    pub fn queue_work<T, E, C>(&self, name: &str, execute: E, complete: C) -> BridgeResult<WorkHandle>
    where
        T: Send + 'static,
        E: FnOnce(&CancellationToken) -> BridgeResult<T> + Send + 'static,
        C: FnOnce(&Env, BridgeResult<T>) + 'static,
    {
        self.check_thread()?;
        if self.is_closing() {
            return Err(BridgeError::Closing);
        }

        let id = InvocationId::next();
        let state = Arc::new(AtomicU8::new(WorkState::Submitted as u8));
        let token = CancellationToken::new();

        let work_name = name.to_string();
        let pending = PendingWork {
            name: name.to_string(),
            state: Arc::clone(&state),
            complete: Box::new(move |env: &Env, output: Box<dyn Any + Send>| {
                let result = match output.downcast::<BridgeResult<T>>() {
                    Ok(result) => *result,
                    Err(_) => Err(BridgeError::CallFailed(format!(
                        "work '{}' produced an unexpected output type",
                        work_name
                    ))),
                };
                complete(env, result);
            }),
        };
        self.inner.works.borrow_mut().insert(id, pending);

        let inbox = Arc::clone(&self.inner.inbox);
        let job_state = Arc::clone(&state);
        let job_token = token.clone();
        let job = Box::new(move || {
            let result: BridgeResult<T> = if job_token.is_cancelled() {
                job_state.store(WorkState::Cancelled as u8, Ordering::Release);
                Err(BridgeError::Cancelled)
            } else {
                job_state.store(WorkState::Executing as u8, Ordering::Release);
                let result = panic::catch_unwind(AssertUnwindSafe(|| execute(&job_token)))
                    .unwrap_or_else(|p| Err(BridgeError::CallFailed(panic_message(p))));
                job_state.store(WorkState::Completed as u8, Ordering::Release);
                result
            };
            inbox.post(InboxEvent::WorkDone {
                id,
                output: Box::new(result),
            });
        });

        if let Err(e) = self.inner.pool.borrow().enqueue(job) {
            self.inner.works.borrow_mut().remove(&id);
            kdebug!("{}: work '{}' rejected: {}", id, name, e);
            return Err(e);
        }

        ktrace!("{}: work '{}' submitted", id, name);
        Ok(WorkHandle { id, state, token })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("execute panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("execute panicked: {}", s)
    } else {
        "execute panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::pool::InlinePool;
    use crate::runtime::Runtime;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn pooled() -> Runtime {
        Runtime::new(
            RuntimeConfig::new()
                .num_workers(2)
                .idle_park(Duration::from_micros(200)),
        )
        .unwrap()
    }

    #[test]
    fn test_execute_off_thread_complete_on_thread() {
        let rt = pooled();
        let runtime_tid = thread::current().id();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = Rc::clone(&seen);
        let handle = rt
            .env()
            .queue_work(
                "tid",
                move |_| Ok(thread::current().id()),
                move |env, result: BridgeResult<thread::ThreadId>| {
                    assert!(env.is_runtime_thread());
                    s.borrow_mut().push((result.unwrap(), thread::current().id()));
                },
            )
            .unwrap();

        rt.run();
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_ne!(seen[0].0, runtime_tid);
        assert_eq!(seen[0].1, runtime_tid);
        assert_eq!(handle.state(), WorkState::Delivered);
    }

    #[test]
    fn test_cancel_before_execute_skips_it() {
        let rt = pooled();
        // Occupy both workers so the target stays queued.
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate_rx = Arc::new(std::sync::Mutex::new(gate_rx));
        for _ in 0..2 {
            let g = Arc::clone(&gate_rx);
            rt.env()
                .queue_work("block", move |_| {
                    let _ = g.lock().unwrap().recv_timeout(Duration::from_secs(5));
                    Ok(())
                }, |_, _: BridgeResult<()>| {})
                .unwrap();
        }
        thread::sleep(Duration::from_millis(20));

        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let r = Arc::clone(&ran);
        let got = Rc::new(RefCell::new(None));
        let g = Rc::clone(&got);
        let handle = rt
            .env()
            .queue_work(
                "target",
                move |_| {
                    r.store(true, Ordering::SeqCst);
                    Ok(1)
                },
                move |_, result: BridgeResult<i32>| *g.borrow_mut() = Some(result),
            )
            .unwrap();
        handle.cancel();
        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();

        rt.run();
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(*got.borrow(), Some(Err(BridgeError::Cancelled)));
        assert_eq!(handle.state(), WorkState::Cancelled);
    }

    #[test]
    fn test_execute_panic_delivers_error_once() {
        let rt = pooled();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let c = Rc::clone(&calls);
        rt.env()
            .queue_work(
                "panics",
                |_| -> BridgeResult<()> { panic!("bad input") },
                move |_, result| c.borrow_mut().push(result),
            )
            .unwrap();
        rt.run();
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            Err(BridgeError::CallFailed("execute panicked: bad input".into()))
        );
    }

    #[test]
    fn test_full_pool_rejects_and_drops_complete() {
        let rt = Runtime::new(
            RuntimeConfig::new()
                .num_workers(1)
                .queue_depth(1)
                .idle_park(Duration::from_micros(200)),
        )
        .unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        rt.env()
            .queue_work("hold", move |_| {
                started_tx.send(()).unwrap();
                let _ = gate_rx.recv_timeout(Duration::from_secs(5));
                Ok(())
            }, |_, _: BridgeResult<()>| {})
            .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        rt.env()
            .queue_work("fills", |_| Ok(()), |_, _: BridgeResult<()>| {})
            .unwrap();

        let result = rt
            .env()
            .queue_work("rejected", |_| Ok(()), |_, _: BridgeResult<()>| {});
        assert!(matches!(result, Err(BridgeError::WorkerUnavailable)));
        assert_eq!(rt.env().outstanding(), 2);

        gate_tx.send(()).unwrap();
        rt.run();
        assert_eq!(rt.env().outstanding(), 0);
    }

    #[test]
    fn test_closing_runtime_refuses_work() {
        let rt = Runtime::with_pool(RuntimeConfig::new(), Box::new(InlinePool::new())).unwrap();
        rt.env().begin_shutdown();
        let result = rt
            .env()
            .queue_work("late", |_| Ok(()), |_, _: BridgeResult<()>| {});
        assert!(matches!(result, Err(BridgeError::Closing)));
    }

    #[test]
    fn test_inline_pool_delivers_on_next_run() {
        let rt = Runtime::with_pool(RuntimeConfig::new(), Box::new(InlinePool::new())).unwrap();
        let out = Rc::new(RefCell::new(None));
        let o = Rc::clone(&out);
        let handle = rt
            .env()
            .queue_work(
                "inline",
                |_| Ok(String::from("done")),
                move |_, r: BridgeResult<String>| *o.borrow_mut() = Some(r),
            )
            .unwrap();
        assert_eq!(handle.state(), WorkState::Completed);
        assert!(out.borrow().is_none());
        assert_eq!(rt.run_once(), 1);
        assert_eq!(*out.borrow(), Some(Ok("done".to_string())));
    }
}
