//! Event-loop-integrated bridge
//!
//! Registers an async handle, lets a tracked thread signal it, and runs the
//! loop on the calling thread until the handler has fired and closed the
//! handle. The caller is blocked for the whole round trip.

use hostbridge_core::error::BridgeResult;
use hostbridge_core::{kdebug, kwarn, Args, Continuation, InvocationId, Value};
use hostbridge_runtime::{AsyncHandle, Env, RunMode, WeakEnv};

use super::Counter;

/// `eventLoopInvoke(callback) -> int`
///
/// Returns the counter after the callback's result was written back, or
/// the unchanged counter if the callback was dropped.
pub fn event_loop_invoke(env: &Env, argv: &[Value], counter: &Counter) -> BridgeResult<Value> {
    let callback = Args::new(argv).function(0)?;
    let id = InvocationId::next();

    let mut slot = Some(Continuation::new(id, callback));
    let weak = env.downgrade();
    let handler_counter = counter.clone();
    let handle = env.event_loop().async_init(move |handle| {
        match slot.take() {
            Some(continuation) => on_signal(&weak, &handler_counter, continuation, handle),
            None => handle.close(),
        }
    });

    let sender = handle.sender();
    let spawned = env.spawn_thread("uv-signal", move || {
        if let Err(e) = sender.send() {
            kwarn!("{}: async send failed: {}", id, e);
        }
    });
    if let Err(e) = spawned {
        handle.close();
        env.event_loop().run(RunMode::NoWait);
        return Err(e);
    }

    env.event_loop().run(RunMode::Default);
    Ok(Value::Int(counter.get()))
}

/// Handler body: runs on the loop thread.
pub(crate) fn on_signal(
    weak: &WeakEnv,
    counter: &Counter,
    continuation: Continuation,
    handle: &AsyncHandle,
) {
    let id = continuation.id();
    let Some(env) = weak.upgrade() else {
        handle.close();
        return;
    };
    debug_assert!(env.is_runtime_thread());

    match env.open_handle_scope() {
        Err(e) => {
            kwarn!("{}: {}; callback dropped", id, e);
            drop(continuation);
        }
        Ok(_scope) => {
            let ret = continuation.call(&[Value::Int(counter.get())]);
            match ret.as_i32() {
                Some(value) => counter.set(value),
                None => kwarn!("{}: callback returned {:?}, counter unchanged", id, ret),
            }
            kdebug!("{}: event loop callback delivered", id);
        }
    }
    handle.close();
}
