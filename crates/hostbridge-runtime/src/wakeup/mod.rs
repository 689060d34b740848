//! Wakeup primitive for the runtime thread and the event loop
//!
//! Workers call `notify()` after pushing a completion; the delivering
//! thread calls `wait()` when it has nothing to do. Platform-specific
//! implementations use the cheapest primitive available.

use std::time::Duration;

use hostbridge_core::Notifier;

/// Notifier with a matching blocking wait
///
/// `wait()` consumes all pending notifications at once (coalescing).
pub trait Wakeup: Notifier {
    /// Block until notified or `timeout` elapses.
    ///
    /// Returns:
    /// - `true` if a notification was consumed
    /// - `false` on timeout or spurious wakeup
    ///
    /// Callers re-check their queues regardless of the return value.
    fn wait(&self, timeout: Option<Duration>) -> bool;
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod eventfd_linux;
        pub use eventfd_linux::EventFdWakeup as PlatformWakeup;
    } else {
        mod fallback;
        pub use fallback::CondvarWakeup as PlatformWakeup;
    }
}

/// Create a new platform-appropriate wakeup
pub fn new_wakeup() -> hostbridge_core::BridgeResult<PlatformWakeup> {
    PlatformWakeup::create()
}
