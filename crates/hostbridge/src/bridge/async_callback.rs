//! Work-queue callback bridge
//!
//! The read runs on a pool worker; the callback is invoked on the runtime
//! thread with the contents, or with an `Error` value when the read failed.

use hostbridge_core::error::BridgeResult;
use hostbridge_core::{kdebug, ktrace, Args, Continuation, Function, Value};
use hostbridge_runtime::{Env, WorkHandle};

use super::ReadContext;

/// `asyncReadCallback(fileName, resourceHandle, callback)`
pub fn async_read_callback(env: &Env, argv: &[Value]) -> BridgeResult<Value> {
    let args = Args::new(argv);
    let ctx = ReadContext::from_args(&args)?;
    let callback = args.function(2)?;
    submit_read_callback(env, ctx, callback)?;
    Ok(Value::Undefined)
}

/// Queue the read; the returned handle exposes state and cancellation.
pub fn submit_read_callback(env: &Env, ctx: ReadContext, callback: Function) -> BridgeResult<WorkHandle> {
    let id = ctx.id;
    let continuation = Continuation::new(id, callback);
    let capacity = env.config().read_capacity;

    env.queue_work(
        "asyncWorkCallback",
        move |token| ctx.execute(token, capacity),
        move |env: &Env, result: BridgeResult<String>| {
            debug_assert!(env.is_runtime_thread());
            let arg = match result {
                Ok(contents) => Value::String(contents),
                Err(e) => {
                    kdebug!("{}: read failed: {}", id, e);
                    Value::from(e)
                }
            };
            let ret = continuation.call(&[arg]);
            ktrace!("{}: callback returned {:?}", id, ret);
        },
    )
}
