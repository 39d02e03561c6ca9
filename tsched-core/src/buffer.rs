// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The device buffer descriptor and write cursor (spec §3).

/// A negotiated hardware buffer's shape.
///
/// Invariants: all fields are integer multiples of `frame_size_bytes`;
/// `0 <= hwbuf_unused_bytes < hwbuf_size_bytes`; `fragment_size_bytes` divides
/// `hwbuf_size_bytes`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeviceBuffer {
    pub frame_size_bytes: u32,
    pub fragment_size_bytes: u32,
    pub hwbuf_size_bytes: u32,
    pub hwbuf_unused_bytes: u32,
}

impl DeviceBuffer {
    /// Whether the descriptor satisfies its stated invariants.
    pub fn is_valid(&self) -> bool {
        self.frame_size_bytes > 0
            && self.hwbuf_size_bytes % self.frame_size_bytes == 0
            && self.fragment_size_bytes % self.frame_size_bytes == 0
            && self.hwbuf_unused_bytes % self.frame_size_bytes == 0
            && self.hwbuf_unused_bytes < self.hwbuf_size_bytes
            && self.fragment_size_bytes > 0
            && self.hwbuf_size_bytes % self.fragment_size_bytes == 0
    }

    /// The portion of `hwbuf_size_bytes` actually usable given the current `hwbuf_unused_bytes`
    /// reserve (spec §4.4 step 7: "submit up to `n_bytes - hwbuf_unused` bytes").
    #[inline]
    pub fn usable_bytes(&self) -> u32 {
        self.hwbuf_size_bytes - self.hwbuf_unused_bytes
    }

    /// Recomputes `hwbuf_unused_bytes` for a given minimum requested latency, in bytes, rounding
    /// down to a whole frame (spec §4.5's `update_requested_latency`, spec §8's boundary
    /// behavior: "requested latency at or above hwbuf yields hwbuf_unused = 0").
    pub fn with_requested_latency_bytes(&self, requested_bytes: u32) -> Self {
        let requested = requested_bytes.min(self.hwbuf_size_bytes);
        let frame = self.frame_size_bytes;
        let rounded = (requested / frame) * frame;
        let unused = self.hwbuf_size_bytes.saturating_sub(rounded.max(frame));
        let unused = (unused / frame) * frame;
        DeviceBuffer { hwbuf_unused_bytes: unused, ..*self }
    }
}

/// Tracks bytes submitted to the device across the lifetime of the current open/start episode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct WriteCursor {
    /// Bytes submitted to the device since the cursor was last reset.
    write_count: u64,
    /// Bytes submitted since the most recent underrun recovery / (re)start.
    since_start: u64,
    /// True until the first successful submission after start.
    first: bool,
    /// True for the iteration immediately following a rewind.
    after_rewind: bool,
}

impl WriteCursor {
    /// A freshly (re)started cursor: `first` set, everything else zeroed.
    pub fn fresh() -> Self {
        WriteCursor { write_count: 0, since_start: 0, first: true, after_rewind: false }
    }

    #[inline]
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    #[inline]
    pub fn since_start(&self) -> u64 {
        self.since_start
    }

    #[inline]
    pub fn is_first(&self) -> bool {
        self.first
    }

    #[inline]
    pub fn is_after_rewind(&self) -> bool {
        self.after_rewind
    }

    /// Records a successful submission of `bytes`.
    pub fn submit(&mut self, bytes: u64) {
        self.write_count += bytes;
        self.since_start += bytes;
        self.first = false;
        self.after_rewind = false;
    }

    /// Records a rewind of `rewound` bytes (invariant 2: `rewound <= hwbuf - watermark - unused`,
    /// enforced by the caller in `scheduler::rewind`).
    pub fn apply_rewind(&mut self, rewound: u64) {
        self.write_count = self.write_count.saturating_sub(rewound);
        // spec §9 open question 2: a zero-byte rewind does not set `after_rewind`, matching the
        // original's behavior; see DESIGN.md.
        if rewound > 0 {
            self.after_rewind = true;
        }
    }

    /// Resets to a fresh post-restart cursor, used on negotiation/recovery restart.
    pub fn restart(&mut self) {
        *self = WriteCursor::fresh();
    }

    /// Clears the `first`/`after_rewind` flags at the end of a completed iteration (spec §4.4
    /// step 12).
    pub fn clear_iteration_flags(&mut self) {
        self.first = false;
        self.after_rewind = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_48k_2s() -> DeviceBuffer {
        DeviceBuffer {
            frame_size_bytes: 4,
            fragment_size_bytes: 192_000,
            hwbuf_size_bytes: 384_000,
            hwbuf_unused_bytes: 0,
        }
    }

    #[test]
    fn valid_descriptor_passes_invariants() {
        assert!(stereo_48k_2s().is_valid());
    }

    #[test]
    fn latency_at_or_above_hwbuf_yields_zero_unused() {
        let buf = stereo_48k_2s().with_requested_latency_bytes(500_000);
        assert_eq!(buf.hwbuf_unused_bytes, 0);
    }

    #[test]
    fn write_count_decreases_by_rewound_amount() {
        let mut cursor = WriteCursor::fresh();
        cursor.submit(384_000);
        cursor.apply_rewind(100_000);
        assert_eq!(cursor.write_count(), 284_000);
        assert!(cursor.is_after_rewind());
    }

    #[test]
    fn zero_byte_rewind_does_not_set_after_rewind() {
        let mut cursor = WriteCursor::fresh();
        cursor.submit(384_000);
        cursor.clear_iteration_flags();
        cursor.apply_rewind(0);
        assert!(!cursor.is_after_rewind());
    }
}
