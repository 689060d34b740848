//! # hostbridge-runtime
//!
//! Single-threaded host runtime for hostbridge.
//!
//! This crate provides:
//! - Runtime configuration (env overrides over compile-time defaults)
//! - Wakeup primitive (eventfd on Linux, condvar elsewhere)
//! - Fixed worker pool for async work
//! - Async work with completion on the runtime thread
//! - Thread-safe functions for calls from arbitrary threads
//! - An event loop with coalescing async handles
//! - Handle scopes

pub mod config;
pub mod wakeup;
pub mod pool;
pub mod runtime;
pub mod async_work;
pub mod tsfn;
pub mod event_loop;
pub mod scope;

mod inbox;

// Re-exports
pub use config::{ConfigError, RuntimeConfig};
pub use wakeup::{new_wakeup, PlatformWakeup, Wakeup};
pub use pool::{FixedPool, InlinePool};
pub use runtime::{Env, Runtime, WeakEnv};
pub use async_work::{WorkHandle, WorkState};
pub use tsfn::{CallMode, ThreadSafeFunction};
pub use event_loop::{AsyncHandle, AsyncSender, EventLoop, RunMode};
pub use scope::HandleScope;
