//! # hostbridge
//!
//! Cross-thread result delivery into a single-threaded managed runtime.
//!
//! Native work runs on the caller, on a pool worker, or on a tracked
//! thread; its result always reaches managed code on the runtime thread.
//!
//! ```ignore
//! use hostbridge::{register, Runtime, RuntimeConfig, TextGenerator, NullBackend};
//!
//! let rt = Runtime::new(RuntimeConfig::from_env())?;
//! let exports = register(TextGenerator::new(Box::new(NullBackend)));
//! let promise = exports.call(rt.env(), "asyncReadPromise", &[name, handle])?;
//! rt.run();
//! ```

pub mod bridge;
pub mod exports;
pub mod textgen_bindings;

pub use bridge::{Counter, ReadContext};
pub use exports::{register, Exports, NativeFn};

pub use hostbridge_core::{
    BridgeError, BridgeResult, DirResourceManager, Function, MemoryResourceManager, Promise,
    PromiseState, ResourceHandle, ResourceManager, Value,
};
pub use hostbridge_runtime::{Env, FixedPool, InlinePool, Runtime, RuntimeConfig};
pub use hostbridge_textgen::{GenerationBackend, NullBackend, TextGenerator};
