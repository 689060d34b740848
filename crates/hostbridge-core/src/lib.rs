//! # hostbridge-core
//!
//! Core types shared by every hostbridge crate.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! The single-threaded host, worker pool and event loop live in
//! `hostbridge-runtime`.
//!
//! ## Modules
//!
//! - `id` - Invocation identifier type
//! - `value` - Managed values (strings, functions, promises, externals)
//! - `continuation` - Move-only callback and promise settlement handles
//! - `resource` - Resource managers and the chunked read loop
//! - `worker` - Worker pool trait
//! - `notifier` - Cross-thread wake trait
//! - `cancel` - Cancellation token for queued work
//! - `error` - Error types
//! - `kprint` - Kernel-style leveled logging macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod value;
pub mod continuation;
pub mod resource;
pub mod worker;
pub mod notifier;
pub mod cancel;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::InvocationId;
pub use value::{Args, External, Function, Promise, PromiseState, Value, ValueType};
pub use continuation::{Continuation, Deferred, Reference};
pub use resource::{
    read_resource, resource_name, DirResourceManager, MemoryResourceManager, RawFile, ResourceHandle,
    ResourceManager,
};
pub use worker::{Job, WorkerPool};
pub use notifier::Notifier;
pub use cancel::CancellationToken;
pub use error::{BridgeError, BridgeResult};
pub use env::{env_get, env_get_bool, env_get_duration_ms, env_get_duration_us};

/// Constants shared across crates
pub mod constants {
    /// Bytes requested from a resource per read call
    pub const READ_CHUNK: usize = 100;

    /// Default maximum size of a resource read into memory
    pub const DEFAULT_READ_CAPACITY: usize = 50_000;

    /// Maximum length of a resource name copied out of a managed string
    pub const MAX_RESOURCE_NAME: usize = 255;
}
