// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! A `timerfd_create`/`timerfd_settime` wrapper: the deadline timer the Playback Loop arms each
//! iteration (spec §4.4 step 11).

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

/// A `CLOCK_MONOTONIC`-backed one-shot/periodic timer exposed as a pollable file descriptor.
pub struct TimerFd {
    fd: RawFd,
}

impl TimerFd {
    /// Creates a new, disarmed timer.
    pub fn new() -> io::Result<Self> {
        let fd = unsafe { libc::timerfd_create(libc::CLOCK_MONOTONIC, libc::TFD_NONBLOCK) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(TimerFd { fd })
    }

    /// Arms the timer to fire once after `deadline`, disabling any previous arming.
    pub fn arm_oneshot(&self, deadline: Duration) -> io::Result<()> {
        let spec = libc::itimerspec {
            it_interval: libc::timespec { tv_sec: 0, tv_nsec: 0 },
            it_value: libc::timespec {
                tv_sec: deadline.as_secs() as libc::time_t,
                tv_nsec: deadline.subsec_nanos() as i64,
            },
        };
        let rc = unsafe {
            libc::timerfd_settime(self.fd, 0, &spec, std::ptr::null_mut())
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Disarms the timer so it will not fire.
    pub fn disarm(&self) -> io::Result<()> {
        self.arm_oneshot(Duration::ZERO)
    }

    /// Consumes the expiration counter after a poll-in wakeup, per `timerfd(2)`'s required read.
    /// Returns the number of expirations since the last read (normally 1 for a one-shot timer).
    pub fn consume_expirations(&self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        let rc = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, 8) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(0);
            }
            return Err(err);
        }
        Ok(u64::from_ne_bytes(buf))
    }
}

impl AsRawFd for TimerFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for TimerFd {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_disarm_does_not_error() {
        let timer = TimerFd::new().expect("timerfd_create should succeed under test");
        timer.disarm().expect("disarming a fresh timer should succeed");
    }

    #[test]
    fn consume_expirations_on_disarmed_timer_is_zero_or_would_block() {
        let timer = TimerFd::new().expect("timerfd_create should succeed under test");
        let n = timer.consume_expirations().expect("read should not hard-fail when nonblocking");
        assert_eq!(n, 0);
    }
}
