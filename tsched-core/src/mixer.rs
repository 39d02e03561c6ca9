// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The mixer capability interface (spec §9: "Replace indirect function pointers (`set_volume`,
//! `get_volume`, `set_port`, `set_state`) with a capability interface the mixer subsystem
//! supplies to the Sink; the Sink stores an implementation or a null variant indicating
//! 'software fallback'.").
//!
//! The mixer subsystem itself (hardware volume/mute/port control) is an external collaborator,
//! explicitly out of scope per spec §1; this trait is the seam the Sink Facade calls through.

use crate::error::Result;
use crate::volume::ChannelVolumes;

/// A physical output port on a device with more than one (e.g. "Speakers" vs "Headphones").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub description: String,
}

/// Hardware mixer access, supplied by the mixer subsystem. A sink with no usable mixer element
/// stores `None` in its `mixer` field rather than an implementation of this trait, which the
/// Sink Facade treats as "software fallback only" (spec §3's "volume model: hardware-capable?").
pub trait MixerControl: Send {
    /// Whether the underlying element supports dB-scale volume queries.
    fn is_db_capable(&self) -> bool;

    /// The element's 0dB reference volume, used to decide how much of a requested volume can be
    /// satisfied purely in hardware.
    fn base_volume(&self) -> crate::volume::Volume;

    /// Applies `volume` in hardware, returning the volume hardware actually settled on (which
    /// may differ from the request due to the element's step resolution).
    fn set_hardware_volume(&mut self, volume: &ChannelVolumes) -> Result<ChannelVolumes>;

    /// Reads back the volume currently applied in hardware.
    fn get_hardware_volume(&self) -> Result<ChannelVolumes>;

    /// Applies hardware mute.
    fn set_mute(&mut self, mute: bool) -> Result<()>;

    /// Reads back hardware mute state.
    fn get_mute(&self) -> Result<bool>;

    /// Available output ports, if the element exposes more than one.
    fn ports(&self) -> &[Port];

    /// Switches the active output port.
    fn set_port(&mut self, name: &str) -> Result<()>;
}
