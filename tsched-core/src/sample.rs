// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Constants and routines for sample type handling.
//!
//! # Sample formats
//!
//! The format-negotiation fallback list in [`crate::device`] walks these formats in the preference
//! order given by the spec: `FLOAT32NE`, `FLOAT32RE`, `S32NE`, `S32RE`, `S24_32NE`, `S24NE`,
//! `S16NE`, `ALaw`, `ULaw`, `U8`.
//!
//! # Channels
//!
//! Up to [`Spec::CHANNELS_MAX`] channels are supported; see [`crate::channelmap`] to map channel
//! indices to speaker positions.

use crate::time::MicroSeconds;

/// Sample format.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    /// Unsigned 8-bit PCM.
    U8,
    /// 8-bit a-Law.
    ALaw,
    /// 8-bit mu-Law.
    ULaw,
    /// Signed 16-bit PCM, little endian.
    S16le,
    /// Signed 16-bit PCM, big endian.
    S16be,
    /// 32-bit IEEE floating point, little endian, range -1.0 to 1.0.
    F32le,
    /// 32-bit IEEE floating point, big endian, range -1.0 to 1.0.
    F32be,
    /// Signed 32-bit PCM, little endian.
    S32le,
    /// Signed 32-bit PCM, big endian.
    S32be,
    /// Signed 24-bit PCM packed, little endian.
    S24le,
    /// Signed 24-bit PCM packed, big endian.
    S24be,
    /// Signed 24-bit PCM in LSB of 32-bit words, little endian.
    S24_32le,
    /// Signed 24-bit PCM in LSB of 32-bit words, big endian.
    S24_32be,
}

#[cfg(target_endian = "big")]
mod ei_formats {
    use super::Format;
    pub const S16NE: Format = Format::S16be;
    pub const FLOAT32NE: Format = Format::F32be;
    pub const S32NE: Format = Format::S32be;
    pub const S24NE: Format = Format::S24be;
    pub const S24_32NE: Format = Format::S24_32be;
    pub const S16RE: Format = Format::S16le;
    pub const FLOAT32RE: Format = Format::F32le;
    pub const S32RE: Format = Format::S32le;
    pub const S24RE: Format = Format::S24le;
    pub const S24_32RE: Format = Format::S24_32le;
}
#[cfg(target_endian = "little")]
mod ei_formats {
    use super::Format;
    pub const S16NE: Format = Format::S16le;
    pub const FLOAT32NE: Format = Format::F32le;
    pub const S32NE: Format = Format::S32le;
    pub const S24NE: Format = Format::S24le;
    pub const S24_32NE: Format = Format::S24_32le;
    pub const S16RE: Format = Format::S16be;
    pub const FLOAT32RE: Format = Format::F32be;
    pub const S32RE: Format = Format::S32be;
    pub const S24RE: Format = Format::S24be;
    pub const S24_32RE: Format = Format::S24_32be;
}

impl Format {
    /// Signed 16-bit PCM, native endian.
    pub const S16NE: Self = self::ei_formats::S16NE;
    /// 32-bit IEEE floating point, native endian.
    pub const FLOAT32NE: Self = self::ei_formats::FLOAT32NE;
    /// Signed 32-bit PCM, native endian.
    pub const S32NE: Self = self::ei_formats::S32NE;
    /// Signed 24-bit PCM packed, native endian.
    pub const S24NE: Self = self::ei_formats::S24NE;
    /// Signed 24-bit PCM in LSB of 32-bit words, native endian.
    pub const S24_32NE: Self = self::ei_formats::S24_32NE;
    /// Signed 16-bit PCM, reverse endian.
    pub const S16RE: Self = self::ei_formats::S16RE;
    /// 32-bit IEEE floating point, reverse endian.
    pub const FLOAT32RE: Self = self::ei_formats::FLOAT32RE;
    /// Signed 32-bit PCM, reverse endian.
    pub const S32RE: Self = self::ei_formats::S32RE;
    /// Signed 24-bit PCM packed, reverse endian.
    pub const S24RE: Self = self::ei_formats::S24RE;
    /// Signed 24-bit PCM in LSB of 32-bit words, reverse endian.
    pub const S24_32RE: Self = self::ei_formats::S24_32RE;

    /// The device's format-negotiation fallback preference list (spec §4.3).
    pub const NEGOTIATION_PREFERENCE: [Format; 10] = [
        Format::FLOAT32NE, Format::FLOAT32RE,
        Format::S32NE, Format::S32RE,
        Format::S24_32NE,
        Format::S24NE,
        Format::S16NE,
        Format::ALaw, Format::ULaw,
        Format::U8,
    ];

    /// Size, in bytes, of one sample of this format.
    pub fn size(&self) -> usize {
        match self {
            Format::U8 | Format::ALaw | Format::ULaw => 1,
            Format::S16le | Format::S16be => 2,
            Format::S24le | Format::S24be => 3,
            Format::F32le | Format::F32be
                | Format::S32le | Format::S32be
                | Format::S24_32le | Format::S24_32be => 4,
        }
    }

    /// `true` if this format varies by endianness at all.
    fn has_endianness(&self) -> bool {
        !matches!(self, Format::U8 | Format::ALaw | Format::ULaw)
    }

    /// Returns `Some(true)` for little endian, `Some(false)` for big endian, `None` if endianness
    /// doesn't apply to this format.
    pub fn is_le(&self) -> Option<bool> {
        if !self.has_endianness() {
            return None;
        }
        Some(matches!(self,
            Format::S16le | Format::F32le | Format::S32le | Format::S24le | Format::S24_32le))
    }

    /// Returns `Some(true)` for big endian. See [`Format::is_le()`].
    pub fn is_be(&self) -> Option<bool> {
        self.is_le().map(|le| !le)
    }

    /// Returns `Some(true)` if this format matches the host's native endianness.
    #[inline]
    pub fn is_ne(&self) -> Option<bool> {
        #[cfg(target_endian = "little")]
        { self.is_le() }
        #[cfg(target_endian = "big")]
        { self.is_be() }
    }
}

/// A sample format and attribute specification: format, rate, and channel count.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Spec {
    /// The sample format.
    pub format: Format,
    /// The sample rate, in Hz (e.g. 44100).
    pub rate: u32,
    /// Number of audio channels (1 for mono, 2 for stereo, ...).
    pub channels: u8,
}

impl Spec {
    /// Maximum number of allowed channels.
    pub const CHANNELS_MAX: u8 = 32;
    /// Maximum allowed sample rate.
    pub const RATE_MAX: u32 = 384_000;

    /// Whether this spec is within the supported ranges.
    pub fn is_valid(&self) -> bool {
        self.rate > 0 && self.rate <= Self::RATE_MAX
            && self.channels > 0 && self.channels <= Self::CHANNELS_MAX
    }

    /// Size, in bytes, of one frame (one sample per channel).
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.format.size() * self.channels as usize
    }

    /// Size, in bytes, of one sample of this spec's format.
    #[inline]
    pub fn sample_size(&self) -> usize {
        self.format.size()
    }

    /// Number of bytes that constitute one second of audio at this spec.
    #[inline]
    pub fn bytes_per_second(&self) -> usize {
        self.frame_size() * self.rate as usize
    }

    /// The time it would take to play a buffer of `length` bytes, rounded down.
    pub fn bytes_to_usec(&self, length: u64) -> MicroSeconds {
        let bps = self.bytes_per_second() as u64;
        if bps == 0 {
            return MicroSeconds::ZERO;
        }
        MicroSeconds(length.saturating_mul(1_000_000) / bps)
    }

    /// The size of buffer required for a playback duration of `t`, rounded down to a whole frame.
    pub fn usec_to_bytes(&self, t: MicroSeconds) -> usize {
        let bytes = (t.as_micros() as u128 * self.bytes_per_second() as u128) / 1_000_000u128;
        let frame = self.frame_size() as u128;
        ((bytes / frame) * frame) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_48k_s16() -> Spec {
        Spec { format: Format::S16le, rate: 48_000, channels: 2 }
    }

    #[test]
    fn frame_size_matches_scenario_constants() {
        // Spec §8 end-to-end scenarios use frame_size = 4 bytes for 48kHz stereo s16.
        assert_eq!(stereo_48k_s16().frame_size(), 4);
    }

    #[test]
    fn hwbuf_two_seconds_is_384000_bytes() {
        let spec = stereo_48k_s16();
        assert_eq!(spec.usec_to_bytes(MicroSeconds::from_secs(2)), 384_000);
    }

    #[test]
    fn bytes_to_usec_and_back_round_trips_on_frame_boundaries() {
        let spec = stereo_48k_s16();
        let bytes = 384_000u64;
        let usec = spec.bytes_to_usec(bytes);
        assert_eq!(spec.usec_to_bytes(usec), bytes as usize);
    }

    #[test]
    fn negotiation_preference_starts_with_float32() {
        assert_eq!(Format::NEGOTIATION_PREFERENCE[0], Format::FLOAT32NE);
    }
}
