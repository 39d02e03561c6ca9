// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Control-plane messages posted from the main thread into the I/O thread's inbox (spec §5, §6).
//!
//! FIFO and causally ordered with respect to the loop's reads; rewind requests are coalesced by
//! the loop (the largest of any pending rewinds prevails), everything else is delivered in order.

use crate::sink::State;
use std::sync::mpsc::SyncSender;

/// A message delivered to the Playback Loop.
#[derive(Debug)]
pub enum Message {
    /// Query the current output latency; the reply channel carries the answer in microseconds.
    GetLatency(SyncSender<u64>),
    /// Request a state transition (spec §4.4's state machine).
    SetState(State),
    /// The mixing core has more audio ready; render up to this many bytes next iteration.
    Render { max_bytes: u32 },
    /// Request a rewind of up to `bytes`. Multiple pending rewinds coalesce to the largest.
    Rewind { bytes: u32 },
    /// The minimum latency requested by any connected client has changed; recompute
    /// `hwbuf_unused` (spec §4.5's `update_requested_latency`).
    UpdateRequestedLatency { min_usec: u64 },
    /// Apply a new volume; delegated to the mixer subsystem where possible (spec §4.5).
    SetVolume(crate::volume::ChannelVolumes),
    /// Apply mute.
    SetMute(bool),
    /// Switch the active output port.
    SetPort(String),
    /// Tear down: drain the inbox and exit (spec §5's cancellation protocol).
    Shutdown,
}

/// Coalesces a batch of pending messages, folding multiple `Rewind`s into the single largest
/// request and keeping the relative order of everything else (spec §5's ordering guarantees).
pub fn coalesce(mut pending: Vec<Message>) -> Vec<Message> {
    let mut max_rewind: Option<u32> = None;
    pending.retain(|m| match m {
        Message::Rewind { bytes } => {
            max_rewind = Some(max_rewind.map_or(*bytes, |m| m.max(*bytes)));
            false
        }
        _ => true,
    });
    if let Some(bytes) = max_rewind {
        pending.push(Message::Rewind { bytes });
    }
    pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_rewinds_coalesce_to_the_largest() {
        let pending = vec![
            Message::Rewind { bytes: 1_000 },
            Message::SetMute(true),
            Message::Rewind { bytes: 5_000 },
            Message::Rewind { bytes: 2_000 },
        ];
        let coalesced = coalesce(pending);
        let rewinds: Vec<u32> = coalesced.iter().filter_map(|m| match m {
            Message::Rewind { bytes } => Some(*bytes),
            _ => None,
        }).collect();
        assert_eq!(rewinds, vec![5_000]);
    }
}
