//! Thread-safe invocation bridge
//!
//! Each call gets its own thread-safe function. A tracked thread makes one
//! non-blocking call and releases; the marshaling closure runs on the
//! runtime thread, calls the callback with the counter, stores the integer
//! result back and resolves the promise with it.
//!
//! ```text
//!   runtime thread                    tsfn-worker
//!   ──────────────                    ───────────
//!   create tsfn (1 ref)
//!   acquire (for worker)  ──spawn──►  call(id, NonBlocking)
//!   release (creator)                 release
//!   ...
//!   marshal: callback(counter) → counter, resolve
//!   finalize
//! ```

use hostbridge_core::error::{BridgeError, BridgeResult};
use hostbridge_core::{kdebug, kwarn, Args, Deferred, InvocationId, Promise, Reference, Value};
use hostbridge_runtime::{CallMode, Env};

use super::Counter;

/// `threadSafeInvoke(callback) -> Promise<int>`
pub fn thread_safe_invoke(env: &Env, argv: &[Value], counter: &Counter) -> BridgeResult<Value> {
    let callback = Args::new(argv).function(0)?;
    let id = InvocationId::next();
    let (deferred, promise) = Promise::deferred(id);

    let mut context = Some((Reference::new(Value::Function(callback)), deferred));
    let counter = counter.clone();
    let tsfn = env.create_threadsafe_function(
        "ThreadSafeCase",
        0,
        1,
        move |env: &Env, ticket: InvocationId| {
            match context.take() {
                Some((reference, deferred)) => marshal(env, &counter, ticket, reference, deferred),
                None => kwarn!("{}: duplicate call ignored", ticket),
            }
        },
    )?;

    let worker = tsfn.clone();
    worker.acquire()?;
    let spawned = env.spawn_thread("tsfn-worker", move || {
        if let Err(e) = worker.call(id, CallMode::NonBlocking) {
            kwarn!("{}: thread-safe call failed: {}", id, e);
        }
        if let Err(e) = worker.release() {
            kwarn!("{}: release failed: {}", id, e);
        }
    });
    if let Err(e) = spawned {
        // Drop the worker's and the creator's reference.
        let _ = tsfn.release();
        let _ = tsfn.release();
        return Err(e);
    }
    tsfn.release()?;

    Ok(Value::Promise(promise))
}

/// Runtime-thread half: invoke, write back, settle.
pub(crate) fn marshal(
    env: &Env,
    counter: &Counter,
    id: InvocationId,
    reference: Reference,
    deferred: Deferred,
) {
    debug_assert!(env.is_runtime_thread());
    let continuation = match reference.into_continuation(id) {
        Ok(continuation) => continuation,
        Err(e) => {
            kdebug!("{}: held value is not callable, dropped", id);
            deferred.reject(Value::from(e));
            return;
        }
    };

    let ret = continuation.call(&[Value::Int(counter.get())]);
    match ret.as_i32() {
        Some(value) => {
            counter.set(value);
            deferred.resolve(Value::Int(value));
        }
        None => {
            kwarn!("{}: callback returned {:?}, counter unchanged", id, ret);
            deferred.reject(Value::from(BridgeError::CallFailed(
                "callback must return an integer".into(),
            )));
        }
    }
}
