// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! A reading of the OS monotonic clock (`CLOCK_MONOTONIC`), used as the scheduler's one and only
//! notion of "now". All timer deadlines are computed relative to a [`MonotonicTs`].

use std::time::Instant;
use super::MicroSeconds;

/// A point in time on the monotonic clock.
///
/// Wraps [`std::time::Instant`] (which is backed by `CLOCK_MONOTONIC` on Linux) rather than calling
/// `clock_gettime` directly; the raw syscall is only needed where `tsched-sys`'s `timerfd` and
/// `clock_getres` probes are involved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicTs(Instant);

impl MonotonicTs {
    /// Reads the clock now.
    #[inline]
    pub fn now() -> Self {
        MonotonicTs(Instant::now())
    }

    /// The elapsed time from `self` to `later`. Returns zero if `later` is not after `self`
    /// (the monotonic clock never goes backwards, but two deadlines computed independently might).
    #[inline]
    pub fn elapsed_until(self, later: MonotonicTs) -> MicroSeconds {
        later.0.checked_duration_since(self.0).map(MicroSeconds::from).unwrap_or(MicroSeconds::ZERO)
    }

    /// Advances this timestamp by a duration.
    #[inline]
    pub fn plus(self, d: MicroSeconds) -> Self {
        MonotonicTs(self.0 + std::time::Duration::from(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn elapsed_is_monotonic_non_decreasing() {
        let t0 = MonotonicTs::now();
        sleep(Duration::from_millis(1));
        let t1 = MonotonicTs::now();
        assert!(t0.elapsed_until(t1) >= MicroSeconds::ZERO);
        assert!(t1 >= t0);
    }

    #[test]
    fn elapsed_until_earlier_saturates_to_zero() {
        let t0 = MonotonicTs::now();
        let t1 = t0.plus(MicroSeconds::from_millis(5));
        assert_eq!(t1.elapsed_until(t0), MicroSeconds::ZERO);
    }
}
