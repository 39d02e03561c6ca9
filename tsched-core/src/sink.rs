// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The Sink Facade (spec §4.5) and the Sink data model (spec §3): the object exposed to the
//! mixing core and to control-plane callers.

use crate::channelmap::Map;
use crate::error::{Code, Error, Result};
use crate::mixer::MixerControl;
use crate::proplist::Proplist;
use crate::sample::Spec;
use crate::time::MicroSeconds;
use crate::volume::{ChannelVolumes, Volume};

/// The sink's lifecycle state (spec §3; transitions restricted to spec §4.4's diagram).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    Init,
    Idle,
    Running,
    Suspended,
    Unlinked,
    Invalid,
}

/// Why the sink is suspended. Nonzero iff `state == Suspended` (spec §3's invariant).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SuspendCause(u32);

impl SuspendCause {
    pub const NONE: Self = SuspendCause(0);
    pub const APPLICATION: Self = SuspendCause(1 << 0);
    pub const IDLE: Self = SuspendCause(1 << 1);
    pub const SESSION: Self = SuspendCause(1 << 2);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn with(self, other: Self) -> Self {
        SuspendCause(self.0 | other.0)
    }

    #[inline]
    pub fn without(self, other: Self) -> Self {
        SuspendCause(self.0 & !other.0)
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// The sink's volume model (spec §3): hardware-capable?, dB-capable?, base volume, and the
/// software-volume fallback applied for whatever hardware can't reach.
#[derive(Debug, Clone)]
pub struct VolumeModel {
    pub hardware_capable: bool,
    pub db_capable: bool,
    pub base_volume: Volume,
    /// What's currently requested by the client, before the hardware/software split.
    pub requested: ChannelVolumes,
    /// The residual applied in the software mixer, after hardware absorbed what it could.
    pub software_residual: ChannelVolumes,
    pub muted: bool,
}

impl VolumeModel {
    pub fn new(channels: u8) -> Self {
        VolumeModel {
            hardware_capable: false,
            db_capable: false,
            base_volume: Volume::NORMAL,
            requested: ChannelVolumes::normal(channels),
            software_residual: ChannelVolumes::normal(channels),
            muted: false,
        }
    }
}

/// An active output port, when the device exposes more than one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePort {
    pub name: String,
}

/// Requested-latency range negotiable by connected clients (spec §3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LatencyRange {
    pub min: MicroSeconds,
    pub max: MicroSeconds,
    pub current: MicroSeconds,
}

/// The addressable playback endpoint (spec §3's `Sink`).
pub struct Sink {
    pub name: String,
    pub description: String,
    pub driver: &'static str,
    pub spec: Spec,
    pub channel_map: Map,
    pub state: State,
    pub suspend_cause: SuspendCause,
    pub volume: VolumeModel,
    pub active_port: Option<ActivePort>,
    pub latency: LatencyRange,
    pub properties: Proplist,
    mixer: Option<Box<dyn MixerControl>>,
}

impl Sink {
    /// Constructs a sink in `Init` state. Device negotiation (via [`crate::device::DeviceAdapter`])
    /// must complete before the caller transitions it to `Idle`.
    pub fn new(
        name: String,
        description: String,
        spec: Spec,
        channel_map: Map,
        latency: LatencyRange,
        properties: Proplist,
    ) -> Self {
        let channels = spec.channels;
        Sink {
            name,
            description,
            driver: "tsched",
            spec,
            channel_map,
            state: State::Init,
            suspend_cause: SuspendCause::NONE,
            volume: VolumeModel::new(channels),
            active_port: None,
            latency,
            properties,
            mixer: None,
        }
    }

    /// Installs (or removes, with `None`) the mixer capability interface (spec §9's capability
    /// interface design note). `None` means pure software fallback.
    pub fn set_mixer(&mut self, mixer: Option<Box<dyn MixerControl>>) {
        self.volume.hardware_capable = mixer.is_some();
        self.volume.db_capable = mixer.as_ref().map(|m| m.is_db_capable()).unwrap_or(false);
        if let Some(m) = &mixer {
            self.volume.base_volume = m.base_volume();
        }
        self.mixer = mixer;
    }

    /// Computes output latency (spec §4.5): `bytes_to_time(write_count) - smoother_get(now) +
    /// pending_unsubmitted_bytes`, clamped at zero. The scheduler owns `write_count` and the
    /// smoother; this takes their already-computed contribution as `played_usec` and
    /// `pending_bytes` from the caller, keeping the facade itself free of device access.
    pub fn get_latency(&self, write_count_usec: MicroSeconds, played_usec: MicroSeconds, pending_bytes_usec: MicroSeconds) -> MicroSeconds {
        write_count_usec.saturating_sub(played_usec).saturating_add(pending_bytes_usec)
    }

    /// Validates a state transition against spec §4.4's diagram without performing it; the
    /// caller (owning the scheduler/device lifetime) performs the actual side effects and then
    /// calls [`Sink::apply_state`].
    pub fn validate_transition(&self, new: State) -> Result<()> {
        use State::*;
        let ok = matches!(
            (self.state, new),
            (Init, Idle)
                | (Idle, Running) | (Running, Idle)
                | (Idle, Suspended) | (Running, Suspended)
                | (Suspended, Idle) | (Suspended, Running)
                | (_, Unlinked)
                | (Suspended, Suspended) // idempotent suspend, spec §8's law
        );
        if ok {
            Ok(())
        } else {
            Err(Error::with_context(
                Code::LoopInvariantViolation,
                format!("illegal transition {:?} -> {:?}", self.state, new),
            ))
        }
    }

    /// Applies a state transition already validated by [`Sink::validate_transition`], updating
    /// the suspend-cause invariant.
    pub fn apply_state(&mut self, new: State, cause: SuspendCause) {
        self.state = new;
        self.suspend_cause = if new == State::Suspended { cause } else { SuspendCause::NONE };
    }

    /// Recomputes `hwbuf_unused` given the minimum latency requested by any connected client
    /// (spec §4.5's `update_requested_latency`). Returns the new buffer descriptor and whether a
    /// full rewind is now required because the usable region shrank.
    pub fn update_requested_latency(
        &mut self,
        min_requested: MicroSeconds,
        buffer: crate::buffer::DeviceBuffer,
    ) -> (crate::buffer::DeviceBuffer, bool) {
        let requested_bytes = self.spec.usec_to_bytes(min_requested.max(MicroSeconds::from_millis(0))) as u32;
        // Spec §8: requested latency below one frame rounds up to one frame.
        let requested_bytes = requested_bytes.max(buffer.frame_size_bytes);
        let new_buffer = buffer.with_requested_latency_bytes(requested_bytes);
        let shrank = new_buffer.hwbuf_unused_bytes > buffer.hwbuf_unused_bytes;
        self.latency.current = min_requested;
        (new_buffer, shrank)
    }

    /// Sets volume, splitting between hardware and software per spec §4.5's rule (skip the
    /// software residual if it's within 1% of nominal).
    pub fn set_volume(&mut self, requested: ChannelVolumes) -> Result<()> {
        self.volume.requested = requested.clone();
        match &mut self.mixer {
            Some(mixer) => {
                let applied_in_hw = mixer.set_hardware_volume(&requested)?;
                self.volume.software_residual = requested.residual_after_hardware(&applied_in_hw);
            }
            None => {
                self.volume.software_residual = requested;
            }
        }
        Ok(())
    }

    pub fn get_volume(&self) -> &ChannelVolumes {
        &self.volume.requested
    }

    pub fn set_mute(&mut self, mute: bool) -> Result<()> {
        self.volume.muted = mute;
        if let Some(mixer) = &mut self.mixer {
            mixer.set_mute(mute)?;
        }
        Ok(())
    }

    pub fn get_mute(&self) -> bool {
        self.volume.muted
    }

    pub fn set_port(&mut self, name: &str) -> Result<()> {
        if let Some(mixer) = &mut self.mixer {
            mixer.set_port(name)?;
        }
        self.active_port = Some(ActivePort { name: name.to_string() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Format;

    fn test_sink() -> Sink {
        Sink::new(
            "test".into(),
            "Test Sink".into(),
            Spec { format: Format::S16NE, rate: 48_000, channels: 2 },
            Map::stereo(),
            LatencyRange { min: MicroSeconds::from_millis(10), max: MicroSeconds::from_secs(2), current: MicroSeconds::from_millis(20) },
            Proplist::new(),
        )
    }

    #[test]
    fn idempotent_suspend_is_a_legal_no_op_transition() {
        let mut sink = test_sink();
        sink.apply_state(State::Idle, SuspendCause::NONE);
        sink.apply_state(State::Suspended, SuspendCause::APPLICATION);
        assert!(sink.validate_transition(State::Suspended).is_ok());
    }

    #[test]
    fn suspend_cause_is_nonzero_iff_suspended() {
        let mut sink = test_sink();
        sink.apply_state(State::Idle, SuspendCause::NONE);
        assert!(sink.suspend_cause.is_none());
        sink.apply_state(State::Suspended, SuspendCause::IDLE);
        assert!(!sink.suspend_cause.is_none());
        sink.apply_state(State::Idle, SuspendCause::NONE);
        assert!(sink.suspend_cause.is_none());
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let sink = test_sink();
        assert!(sink.validate_transition(State::Running).is_err());
    }

    #[test]
    fn volume_without_mixer_goes_entirely_to_software() {
        let mut sink = test_sink();
        let requested = ChannelVolumes::normal(2);
        sink.set_volume(requested.clone()).unwrap();
        assert_eq!(sink.volume.software_residual, requested);
    }

    #[test]
    fn requested_latency_below_one_frame_rounds_up() {
        let mut sink = test_sink();
        let buffer = crate::buffer::DeviceBuffer {
            frame_size_bytes: 4,
            fragment_size_bytes: 192_000,
            hwbuf_size_bytes: 384_000,
            hwbuf_unused_bytes: 0,
        };
        let (new_buffer, _) = sink.update_requested_latency(MicroSeconds::ZERO, buffer);
        assert!(new_buffer.hwbuf_unused_bytes <= buffer.hwbuf_size_bytes - buffer.frame_size_bytes);
    }
}
