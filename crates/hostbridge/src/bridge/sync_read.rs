//! Blocking read on the caller's thread.

use hostbridge_core::error::BridgeResult;
use hostbridge_core::{ktrace, Args, Value};
use hostbridge_runtime::Env;

use super::ReadContext;

/// `syncRead(fileName, resourceHandle, callback?) -> string`
///
/// Errors are returned to the caller. When a callback is passed it is
/// invoked with the contents before they are returned.
pub fn sync_read(env: &Env, argv: &[Value]) -> BridgeResult<Value> {
    env.check_thread()?;
    let args = Args::new(argv);
    let ctx = ReadContext::from_args(&args)?;
    let callback = args.opt_function(2)?;

    let contents = ctx.read(env.config().read_capacity)?;
    if let Some(callback) = callback {
        let ret = callback.call(&[Value::String(contents.clone())]);
        ktrace!("{}: sync callback returned {:?}", ctx.id, ret);
    }
    Ok(Value::String(contents))
}
