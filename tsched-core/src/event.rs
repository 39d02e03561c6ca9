// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Events the Sink Facade emits to its embedder (spec §6's "Event outputs", expanded into a
//! concrete type). Delivered one-way, the opposite direction of the control-plane message inbox
//! in [`crate::message`].

use crate::sink::{State, SuspendCause};

/// A notable change in sink state, surfaced to whatever owns the [`crate::sink::Sink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// The sink's state enum transitioned.
    StateChanged { from: State, to: State },
    /// The suspend-cause bitset changed (while remaining, or becoming, nonzero).
    SuspendCauseChanged { cause: SuspendCause },
    /// The watermark controller adjusted its margin.
    WatermarkChanged { bytes: u64 },
    /// The watermark and the minimum-latency floor are both pinned at their clamp; the device is
    /// effectively too jittery for the current configuration (spec §9 open question 3).
    WatermarkSaturated,
    /// A device reading (`avail`, `delay`, `mmap_begin`) was outside the sane range and clamped.
    DriverBugObserved { kind: DriverBugKind, value: u64 },
    /// The requested-latency range changed (e.g. after `update_requested_latency`).
    LatencyRangeChanged { min_usec: u64, max_usec: u64 },
}

/// Which device reading triggered a [`SinkEvent::DriverBugObserved`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DriverBugKind {
    Avail,
    Delay,
    MmapBegin,
}
