//! Linux eventfd wakeup
//!
//! `notify()` writes 1 to a non-blocking eventfd. `wait()` polls the fd
//! and drains the counter with a single read, so any number of notifies
//! before the wait collapse into one wakeup.

use super::Wakeup;
use hostbridge_core::error::{BridgeError, BridgeResult};
use hostbridge_core::Notifier;

use std::os::unix::io::RawFd;
use std::time::Duration;

pub struct EventFdWakeup {
    fd: RawFd,
}

fn last_errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

impl EventFdWakeup {
    /// Create a new eventfd. The wakeup owns the fd and closes it on Drop.
    pub fn create() -> BridgeResult<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(BridgeError::Os(last_errno()));
        }
        Ok(Self { fd })
    }

    /// Read and reset the counter. `true` if it was non-zero.
    fn drain(&self) -> bool {
        let mut val: u64 = 0;
        let ret = unsafe {
            libc::read(
                self.fd,
                &mut val as *mut u64 as *mut libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        ret == std::mem::size_of::<u64>() as isize && val > 0
    }
}

impl Notifier for EventFdWakeup {
    fn notify(&self) -> BridgeResult<()> {
        let val: u64 = 1;
        let ret = unsafe {
            libc::write(
                self.fd,
                &val as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if ret < 0 {
            let errno = last_errno();
            // EAGAIN: counter saturated, a wakeup is already pending.
            if errno == libc::EAGAIN {
                return Ok(());
            }
            return Err(BridgeError::Os(errno));
        }
        Ok(())
    }
}

impl Wakeup for EventFdWakeup {
    fn wait(&self, timeout: Option<Duration>) -> bool {
        if self.drain() {
            return true;
        }

        let timeout_ms: libc::c_int = match timeout {
            Some(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
            None => -1,
        };
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret <= 0 {
            // Timeout or EINTR; the caller re-checks its queues either way.
            return false;
        }
        self.drain()
    }
}

impl Drop for EventFdWakeup {
    fn drop(&mut self) {
        if self.fd >= 0 {
            unsafe {
                libc::close(self.fd);
            }
            self.fd = -1;
        }
    }
}
