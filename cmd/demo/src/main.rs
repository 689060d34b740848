//! hostbridge demo
//!
//! Runs every entry point once against a temporary resource directory.
//!
//! # Environment Variables
//!
//! - `HOSTBRIDGE_LOG_LEVEL=debug` - Log level (off, error, warn, info, debug, trace)
//! - `HOSTBRIDGE_LOG_THREAD=1` - Tag log lines with the thread name
//! - `HOSTBRIDGE_NUM_WORKERS=N` - Worker pool size
//!
// HOSTBRIDGE_LOG_LEVEL=debug HOSTBRIDGE_LOG_THREAD=1 cargo run -p hostbridge-demo

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use hostbridge::{
    register, BridgeResult, DirResourceManager, Function, NullBackend, ResourceHandle, Runtime,
    RuntimeConfig, TextGenerator, Value,
};
use hostbridge_core::{kerror, kinfo};

fn temp_resources() -> std::io::Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("hostbridge-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("greeting.txt"), "Hello from a native resource.\n")?;
    std::fs::write(dir.join("empty.txt"), "")?;
    Ok(dir)
}

fn printer(label: &'static str) -> Value {
    Value::Function(Function::new(move |args| {
        println!("  {} <- {:?}", label, args.first().unwrap_or(&Value::Undefined));
        Value::Undefined
    }))
}

fn demo(dir: &Path) -> BridgeResult<()> {
    let mut rt = Runtime::new(RuntimeConfig::from_env())?;
    let exports = register(TextGenerator::new(Box::new(NullBackend)));
    let env = rt.env().clone();
    let handle = ResourceHandle::new(Arc::new(DirResourceManager::new(dir))).into_value();
    let file = Value::from("greeting.txt");

    println!("[1] syncRead");
    let out = exports.call(&env, "syncRead", &[file.clone(), handle.clone(), printer("callback")])?;
    println!("  returned {:?}", out);

    println!("[2] asyncReadCallback");
    exports.call(&env, "asyncReadCallback", &[file.clone(), handle.clone(), printer("callback")])?;
    exports.call(
        &env,
        "asyncReadCallback",
        &[Value::from("missing.txt"), handle.clone(), printer("callback")],
    )?;
    rt.run();

    println!("[3] asyncReadPromise");
    let ok = exports.call(&env, "asyncReadPromise", &[file.clone(), handle.clone()])?;
    let empty = exports.call(&env, "asyncReadPromise", &[Value::from("empty.txt"), handle.clone()])?;
    rt.run();
    for p in [ok, empty] {
        if let Some(p) = p.as_promise() {
            println!("  settled {:?}", p.state());
        }
    }

    println!("[4] threadSafeInvoke");
    let bump = Value::Function(Function::new(|args| {
        Value::Int(args.first().and_then(Value::as_i32).unwrap_or(0) + 1)
    }));
    for _ in 0..3 {
        let p = exports.call(&env, "threadSafeInvoke", &[bump.clone()])?;
        rt.run();
        if let Some(p) = p.as_promise() {
            println!("  settled {:?}", p.state());
        }
    }

    println!("[5] eventLoopInvoke");
    let out = exports.call(&env, "eventLoopInvoke", &[bump])?;
    println!("  returned {:?}", out);

    println!("[6] text generation");
    let loaded = exports.call(&env, "loadModel", &[Value::from("model.gguf")])?;
    println!("  loadModel -> {:?}", loaded);
    println!("  getLastError -> {:?}", exports.call(&env, "getLastError", &[])?);
    println!("  getModelInfo -> {:?}", exports.call(&env, "getModelInfo", &[])?);

    exports.call(&env, "destroy", &[])?;
    kinfo!("counter after destroy: {}", exports.counter().get());

    rt.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    hostbridge_core::kprint::init();
    println!("=== hostbridge demo ===\n");

    let dir = match temp_resources() {
        Ok(dir) => dir,
        Err(e) => {
            kerror!("cannot create resource directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = demo(&dir);
    let _ = std::fs::remove_dir_all(&dir);

    match result {
        Ok(()) => {
            println!("\n=== demo complete ===");
            ExitCode::SUCCESS
        }
        Err(e) => {
            kerror!("demo failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
