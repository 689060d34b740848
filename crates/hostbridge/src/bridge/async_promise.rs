//! Work-queue promise bridge
//!
//! Same execute step as the callback bridge. The promise resolves with the
//! contents when the read succeeded and produced text, and rejects otherwise.

use hostbridge_core::error::BridgeResult;
use hostbridge_core::{kdebug, Args, Promise, Value};
use hostbridge_runtime::{Env, WorkHandle};

use super::ReadContext;

/// `asyncReadPromise(fileName, resourceHandle) -> Promise<string>`
pub fn async_read_promise(env: &Env, argv: &[Value]) -> BridgeResult<Value> {
    let args = Args::new(argv);
    let ctx = ReadContext::from_args(&args)?;
    let (promise, _work) = submit_read_promise(env, ctx)?;
    Ok(Value::Promise(promise))
}

pub fn submit_read_promise(env: &Env, ctx: ReadContext) -> BridgeResult<(Promise, WorkHandle)> {
    let id = ctx.id;
    let (deferred, promise) = Promise::deferred(id);
    let capacity = env.config().read_capacity;

    let work = env.queue_work(
        "asyncWorkPromise",
        move |token| ctx.execute(token, capacity),
        move |env: &Env, result: BridgeResult<String>| {
            debug_assert!(env.is_runtime_thread());
            match result {
                Ok(contents) if !contents.is_empty() => deferred.resolve(Value::String(contents)),
                Ok(_) => deferred.reject(Value::Error("resource is empty".into())),
                Err(e) => {
                    kdebug!("{}: read failed: {}", id, e);
                    deferred.reject(Value::from(e));
                }
            }
        },
    )?;
    Ok((promise, work))
}
