//! Portable wakeup: a pending flag guarded by a mutex plus a condvar.

use super::Wakeup;
use hostbridge_core::error::BridgeResult;
use hostbridge_core::Notifier;

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub struct CondvarWakeup {
    pending: Mutex<bool>,
    cond: Condvar,
}

impl CondvarWakeup {
    pub fn create() -> BridgeResult<Self> {
        Ok(Self {
            pending: Mutex::new(false),
            cond: Condvar::new(),
        })
    }
}

impl Notifier for CondvarWakeup {
    fn notify(&self) -> BridgeResult<()> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending = true;
        self.cond.notify_one();
        Ok(())
    }
}

impl Wakeup for CondvarWakeup {
    fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let deadline = timeout.map(|d| Instant::now() + d);
        while !*pending {
            match deadline {
                None => {
                    pending = self.cond.wait(pending).unwrap_or_else(|e| e.into_inner());
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let (guard, _) = self
                        .cond
                        .wait_timeout(pending, deadline - now)
                        .unwrap_or_else(|e| e.into_inner());
                    pending = guard;
                }
            }
        }
        *pending = false;
        true
    }
}
