// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! A microsecond-resolution time/duration quantity.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::Duration;

/// A quantity of microseconds, used both for durations (a sleep length, a watermark expressed as
/// time) and for absolute readings on one of the two clocks the scheduler reconciles.
#[repr(transparent)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MicroSeconds(pub u64);

impl MicroSeconds {
    /// Zero microseconds.
    pub const ZERO: Self = MicroSeconds(0);

    /// Constructs from a whole number of milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        MicroSeconds(ms * 1_000)
    }

    /// Constructs from a whole number of seconds.
    #[inline]
    pub const fn from_secs(s: u64) -> Self {
        MicroSeconds(s * 1_000_000)
    }

    /// Returns the value as whole milliseconds, truncating.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000
    }

    /// Returns the raw microsecond count.
    #[inline]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Saturating subtraction; never underflows below zero.
    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        MicroSeconds(self.0.saturating_sub(rhs.0))
    }

    /// Saturating addition.
    #[inline]
    pub fn saturating_add(self, rhs: Self) -> Self {
        MicroSeconds(self.0.saturating_add(rhs.0))
    }

    /// Halves the value, rounding down.
    #[inline]
    pub fn halved(self) -> Self {
        MicroSeconds(self.0 / 2)
    }

    /// Doubles the value, saturating.
    #[inline]
    pub fn doubled(self) -> Self {
        MicroSeconds(self.0.saturating_mul(2))
    }

    /// The smaller of two values.
    #[inline]
    pub fn min(self, rhs: Self) -> Self {
        if self.0 <= rhs.0 { self } else { rhs }
    }

    /// The larger of two values.
    #[inline]
    pub fn max(self, rhs: Self) -> Self {
        if self.0 >= rhs.0 { self } else { rhs }
    }
}

impl From<Duration> for MicroSeconds {
    #[inline]
    fn from(d: Duration) -> Self {
        MicroSeconds(d.as_micros() as u64)
    }
}

impl From<MicroSeconds> for Duration {
    #[inline]
    fn from(us: MicroSeconds) -> Self {
        Duration::from_micros(us.0)
    }
}

impl Add for MicroSeconds {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self { MicroSeconds(self.0 + rhs.0) }
}
impl AddAssign for MicroSeconds {
    #[inline]
    fn add_assign(&mut self, rhs: Self) { self.0 += rhs.0; }
}
impl Sub for MicroSeconds {
    type Output = Self;
    /// Panics (in debug builds) on underflow; callers dealing with possibly-negative spans should
    /// use [`MicroSeconds::saturating_sub()`] instead.
    #[inline]
    fn sub(self, rhs: Self) -> Self { MicroSeconds(self.0 - rhs.0) }
}
impl SubAssign for MicroSeconds {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) { self.0 -= rhs.0; }
}

impl fmt::Display for MicroSeconds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_duration() {
        let d = Duration::from_millis(1234);
        let us = MicroSeconds::from(d);
        assert_eq!(us, MicroSeconds::from_millis(1234));
        assert_eq!(Duration::from(us), d);
    }

    #[test]
    fn saturating_sub_never_underflows() {
        let a = MicroSeconds::from_millis(5);
        let b = MicroSeconds::from_millis(10);
        assert_eq!(a.saturating_sub(b), MicroSeconds::ZERO);
    }

    #[test]
    fn clamped_doubling_matches_watermark_inc_rule() {
        let w = MicroSeconds::from_millis(20);
        assert_eq!(w.doubled(), MicroSeconds::from_millis(40));
    }
}
