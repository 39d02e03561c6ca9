// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Rate-limited one-shot logging (spec §9, "Global static TLS / one-shot logging... model as a
//! per-process once-cell carrying rate-limited logger state").
//!
//! A misbehaving driver can report an out-of-range `avail`/`delay`/`mmap_begin` reading on every
//! single wakeup; logging each occurrence at `warn!` would flood the log. A [`OneShotLatch`] per
//! call site throttles that to at most one warning per cooldown window.

use std::time::{Duration, Instant};

/// A per-call-site latch: fires at most once per `cooldown`.
#[derive(Debug)]
pub struct OneShotLatch {
    cooldown: Duration,
    last_fired: Option<Instant>,
}

impl OneShotLatch {
    /// A latch that allows at most one firing per `cooldown`.
    pub fn new(cooldown: Duration) -> Self {
        OneShotLatch { cooldown, last_fired: None }
    }

    /// The default cooldown used for driver-bug warnings.
    pub fn driver_bug() -> Self {
        Self::new(Duration::from_secs(10))
    }

    /// Returns `true` (and resets the window) if this call should actually log; `false` if it's
    /// within the cooldown of a previous firing and should be suppressed.
    pub fn fire_at(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(prev) if now.duration_since(prev) < self.cooldown => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }

    /// Convenience wrapper over [`OneShotLatch::fire_at()`] using [`Instant::now()`].
    #[inline]
    pub fn fire(&mut self) -> bool {
        self.fire_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_always_fires() {
        let mut latch = OneShotLatch::new(Duration::from_secs(1));
        assert!(latch.fire_at(Instant::now()));
    }

    #[test]
    fn repeat_within_cooldown_is_suppressed() {
        let mut latch = OneShotLatch::new(Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(latch.fire_at(t0));
        assert!(!latch.fire_at(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn repeat_after_cooldown_fires_again() {
        let mut latch = OneShotLatch::new(Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(latch.fire_at(t0));
        assert!(latch.fire_at(t0 + Duration::from_secs(11)));
    }
}
