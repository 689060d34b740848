//! Cross-thread notification abstraction.
//!
//! A `Notifier` wakes the runtime thread (or an event loop) when a worker
//! has pushed something it must deliver.
//!
//! # Implementors
//!
//! - `EventFdWakeup` (Linux): writes 1 to an eventfd; the waiter polls it.
//! - `CondvarWakeup` (fallback): flag + condition variable.

use crate::error::BridgeResult;

/// Wakes the thread that delivers results.
///
/// **Contract:**
/// - `notify()` must NEVER block.
/// - Multiple calls before the waiter wakes are coalesced into one wakeup.
/// - Safe to call from any thread.
pub trait Notifier: Send + Sync {
    /// Signal that new work is ready for delivery.
    fn notify(&self) -> BridgeResult<()>;
}
