// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Volume representation and the hardware/software split described in spec §3 and §4.5.
//!
//! A requested volume is applied to hardware where the mixer exposes a usable control; anything
//! hardware can't reach is made up in software, unless the residual is small enough to ignore.

use std::fmt;

/// A volume, on PulseAudio's cubic scale: `NORMAL` is unity gain, `0` is silence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(pub u32);

impl Volume {
    /// Silence.
    pub const MUTED: Self = Volume(0);
    /// Unity gain (0dB, 100%).
    pub const NORMAL: Self = Volume(65536);
    /// The loudest representable volume.
    pub const MAX: Self = Volume(u32::MAX / 2);

    /// Whether this is [`Volume::MUTED`].
    #[inline]
    pub fn is_muted(self) -> bool {
        self == Self::MUTED
    }

    /// Whether this is [`Volume::NORMAL`].
    #[inline]
    pub fn is_normal(self) -> bool {
        self == Self::NORMAL
    }

    /// Clamps to `[MUTED, MAX]`.
    #[inline]
    pub fn clamped(self) -> Self {
        Volume(self.0.min(Self::MAX.0))
    }

    /// Scales by a linear factor (`1.0` is unchanged), clamping the result.
    pub fn scaled(self, factor: f64) -> Self {
        let v = (self.0 as f64 * factor).round();
        Volume(if v < 0.0 { 0 } else if v > Self::MAX.0 as f64 { Self::MAX.0 } else { v as u32 })
    }

    /// Converts to a linear amplitude multiplier, `0.0` to `1.0` at [`Volume::NORMAL`].
    ///
    /// Follows the cubic curve PulseAudio's software mixer uses: `linear = (v / NORMAL)^3`.
    pub fn to_linear(self) -> VolumeLinear {
        let ratio = self.0 as f64 / Self::NORMAL.0 as f64;
        VolumeLinear(ratio * ratio * ratio)
    }

    /// Converts to decibels relative to [`Volume::NORMAL`].
    pub fn to_db(self) -> VolumeDB {
        self.to_linear().to_db()
    }

    /// The residual volume still needed in software after `hw` has been applied in hardware.
    ///
    /// Returns [`Volume::NORMAL`] (no-op) if the residual is within 1% of nominal, per spec
    /// §4.5's rule against applying negligible software adjustments.
    pub fn residual_after_hardware(self, hw: Volume) -> Volume {
        if hw.0 == 0 {
            return self;
        }
        let ratio = self.0 as f64 / hw.0 as f64;
        let residual = Volume::NORMAL.scaled(ratio);
        let delta = (residual.0 as i64 - Volume::NORMAL.0 as i64).unsigned_abs();
        if (delta as f64) < Volume::NORMAL.0 as f64 * 0.01 {
            Volume::NORMAL
        } else {
            residual
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.0}%", self.to_linear().0 * 100.0)
    }
}

/// A volume expressed as a linear amplitude multiplier (`1.0` at [`Volume::NORMAL`]).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VolumeLinear(pub f64);

impl VolumeLinear {
    /// Converts to the cubic [`Volume`] scale, clamping the result.
    pub fn to_volume(self) -> Volume {
        let cbrt = self.0.max(0.0).cbrt();
        Volume((cbrt * Volume::NORMAL.0 as f64).round() as u32).clamped()
    }

    /// Converts to decibels.
    pub fn to_db(self) -> VolumeDB {
        if self.0 <= 0.0 {
            VolumeDB(f64::NEG_INFINITY)
        } else {
            VolumeDB(20.0 * self.0.log10())
        }
    }
}

/// A volume expressed in decibels relative to [`Volume::NORMAL`] (0dB).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VolumeDB(pub f64);

impl VolumeDB {
    /// Converts to a linear amplitude multiplier.
    pub fn to_linear(self) -> VolumeLinear {
        VolumeLinear(10f64.powf(self.0 / 20.0))
    }

    /// Converts to the cubic [`Volume`] scale.
    pub fn to_volume(self) -> Volume {
        self.to_linear().to_volume()
    }
}

/// Per-channel volumes for a sink with a given channel count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelVolumes {
    channels: Vec<Volume>,
}

impl ChannelVolumes {
    /// `channels` entries, all at [`Volume::NORMAL`].
    pub fn normal(channels: u8) -> Self {
        ChannelVolumes { channels: vec![Volume::NORMAL; channels as usize] }
    }

    /// `channels` entries, all at [`Volume::MUTED`].
    pub fn muted(channels: u8) -> Self {
        ChannelVolumes { channels: vec![Volume::MUTED; channels as usize] }
    }

    /// Number of channels.
    #[inline]
    pub fn len(&self) -> u8 {
        self.channels.len() as u8
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The per-channel volumes.
    #[inline]
    pub fn channels(&self) -> &[Volume] {
        &self.channels
    }

    /// Sets every channel to the same volume.
    pub fn set_all(&mut self, v: Volume) {
        for c in self.channels.iter_mut() {
            *c = v;
        }
    }

    /// Whether every channel is muted.
    pub fn is_muted(&self) -> bool {
        self.channels.iter().all(|v| v.is_muted())
    }

    /// The average volume across all channels.
    pub fn avg(&self) -> Volume {
        if self.channels.is_empty() {
            return Volume::MUTED;
        }
        let sum: u64 = self.channels.iter().map(|v| v.0 as u64).sum();
        Volume((sum / self.channels.len() as u64) as u32)
    }

    /// Scales every channel by a linear factor, clamping each result.
    pub fn scale(&mut self, factor: f64) {
        for c in self.channels.iter_mut() {
            *c = c.scaled(factor);
        }
    }

    /// The residual that still needs applying in software once `hw` has been applied in
    /// hardware, per channel. See [`Volume::residual_after_hardware()`].
    pub fn residual_after_hardware(&self, hw: &ChannelVolumes) -> ChannelVolumes {
        let channels = self.channels.iter().zip(hw.channels.iter())
            .map(|(req, hw)| req.residual_after_hardware(*hw))
            .collect();
        ChannelVolumes { channels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_is_unity_linear() {
        assert!((Volume::NORMAL.to_linear().0 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normal_is_zero_db() {
        assert!(Volume::NORMAL.to_db().0.abs() < 1e-6);
    }

    #[test]
    fn muted_is_negative_infinity_db() {
        assert_eq!(Volume::MUTED.to_db().0, f64::NEG_INFINITY);
    }

    #[test]
    fn db_and_linear_round_trip() {
        let db = VolumeDB(-6.0);
        let back = db.to_linear().to_db();
        assert!((back.0 - db.0).abs() < 1e-6);
    }

    #[test]
    fn small_residual_is_skipped() {
        // Requesting within 1% of what hardware already provides needs no software makeup.
        let requested = Volume::NORMAL;
        let hw = Volume(Volume::NORMAL.0 + Volume::NORMAL.0 / 200);
        assert_eq!(requested.residual_after_hardware(hw), Volume::NORMAL);
    }

    #[test]
    fn large_residual_is_applied_in_software() {
        let requested = Volume::NORMAL;
        let hw = Volume(Volume::NORMAL.0 / 2);
        let residual = requested.residual_after_hardware(hw);
        assert!(residual.0 > Volume::NORMAL.0);
    }

    #[test]
    fn channel_volumes_avg_of_uniform_is_itself() {
        let cv = ChannelVolumes::normal(2);
        assert_eq!(cv.avg(), Volume::NORMAL);
    }
}
