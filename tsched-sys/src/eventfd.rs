// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! An `eventfd`-backed wakeup descriptor, used to fold the cross-thread message inbox (an
//! `std::sync::mpsc` channel) into the same `poll(2)` call as the timer and device descriptors
//! (spec §4.4's multiplexed wait).

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

/// A pollable, many-producer wakeup signal: any number of `notify()` calls between two
/// `consume()`s collapse into a single readiness edge, which is all the inbox poll needs.
pub struct EventFd {
    fd: RawFd,
}

impl EventFd {
    /// Creates a new, unsignaled eventfd in non-blocking, semaphore-less mode.
    pub fn new() -> io::Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(EventFd { fd })
    }

    /// Signals the descriptor as ready to read. Safe to call from any thread.
    pub fn notify(&self) -> io::Result<()> {
        let value: u64 = 1;
        let rc = unsafe {
            libc::write(self.fd, &value as *const u64 as *const libc::c_void, 8)
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            // The counter is already nonzero (EAGAIN on a full semaphore-style fd); treat as
            // already-signaled rather than an error, since a coalesced wakeup is harmless here.
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }

    /// Clears the signal after a poll-in wakeup.
    pub fn consume(&self) -> io::Result<()> {
        let mut buf = [0u8; 8];
        let rc = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, 8) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }
}

impl AsRawFd for EventFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for EventFd {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_then_consume_round_trips() {
        let ev = EventFd::new().expect("eventfd should succeed under test");
        ev.notify().expect("notify should succeed");
        ev.consume().expect("consume should succeed after a notify");
    }

    #[test]
    fn consume_without_notify_does_not_error() {
        let ev = EventFd::new().expect("eventfd should succeed under test");
        ev.consume().expect("consuming an unsignaled eventfd should not error");
    }
}
