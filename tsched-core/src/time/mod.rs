// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Time handling.
//!
//! The scheduler works with two distinct clocks (see [`crate::smoother`]): the monotonic system
//! clock (wall time a wakeup actually occurred at) and audio time (how much has been played,
//! expressed as if it were a duration). Both are represented as [`MicroSeconds`]; [`MonotonicTs`]
//! additionally anchors a [`MicroSeconds`] reading to the OS monotonic clock so the elapsed time
//! between two readings can be computed even across process restarts of the clock epoch.

mod microseconds;
mod monotonic;

pub use self::microseconds::MicroSeconds;
pub use self::monotonic::MonotonicTs;

/// Microseconds per millisecond.
pub const MICROS_PER_MILLI: u64 = 1_000;
/// Microseconds per second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
