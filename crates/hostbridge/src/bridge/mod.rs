//! The five delivery patterns
//!
//! | Pattern | Entry | Runs on | Delivers via |
//! |---|---|---|---|
//! | blocking | `sync_read` | caller | return value (+ optional callback) |
//! | work-queue callback | `async_read_callback` | pool worker | continuation call |
//! | work-queue promise | `async_read_promise` | pool worker | promise settlement |
//! | thread-safe function | `thread_safe_invoke` | tracked thread | marshaled call |
//! | event loop | `event_loop_invoke` | tracked thread | async handle signal |
//!
//! Every delivery into managed code happens on the runtime thread.

pub mod state;
pub mod sync_read;
pub mod async_callback;
pub mod async_promise;
pub mod thread_safe;
pub mod event_loop_case;

use hostbridge_core::error::BridgeResult;
use hostbridge_core::{resource_name, Args, CancellationToken, InvocationId, ResourceHandle};

pub use state::Counter;

/// Inputs of one read, owned by whichever thread performs it
pub struct ReadContext {
    pub id: InvocationId,
    pub file_name: String,
    pub resource: ResourceHandle,
}

impl ReadContext {
    /// Copy `(fileName, resourceHandle)` out of the call arguments.
    pub fn from_args(args: &Args<'_>) -> BridgeResult<Self> {
        let file_name = resource_name(args.string(0)?)?;
        let resource = ResourceHandle::from_value(args.get(1)?, 1)?;
        Ok(Self {
            id: InvocationId::next(),
            file_name,
            resource,
        })
    }

    pub fn read(&self, capacity: usize) -> BridgeResult<String> {
        self.resource.read(&self.file_name, capacity)
    }

    /// Worker-side execute step
    pub fn execute(self, token: &CancellationToken, capacity: usize) -> BridgeResult<String> {
        token.check()?;
        self.read(capacity)
    }
}
