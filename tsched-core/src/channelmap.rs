// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Channel mapping: associates each channel in a [`crate::sample::Spec`] with a speaker position.
//!
//! Used by the Sink data model's sample format (§3) and, where a device exposes more than one
//! physical output, to describe the layout of its active port.

use crate::sample::Spec;

/// A channel's speaker position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Position {
    Mono,
    FrontLeft,
    FrontRight,
    FrontCenter,
    RearCenter,
    RearLeft,
    RearRight,
    Lfe,
    SideLeft,
    SideRight,
    /// Auxiliary channel `n`, for mappings with no standard speaker position.
    Aux(u8),
}

/// A channel map: one [`Position`] per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    positions: Vec<Position>,
}

impl Map {
    /// A single mono channel.
    pub fn mono() -> Self {
        Map { positions: vec![Position::Mono] }
    }

    /// Standard stereo: left, right.
    pub fn stereo() -> Self {
        Map { positions: vec![Position::FrontLeft, Position::FrontRight] }
    }

    /// A channel map for `channels` channels, using a standard layout where one is known
    /// (1 = mono, 2 = stereo), else numbering channels as auxiliary.
    pub fn auto(channels: u8) -> Self {
        match channels {
            0 => Map { positions: Vec::new() },
            1 => Self::mono(),
            2 => Self::stereo(),
            n => Map { positions: (0..n).map(Position::Aux).collect() },
        }
    }

    /// Number of channels in this map.
    #[inline]
    pub fn channels(&self) -> u8 {
        self.positions.len() as u8
    }

    /// The positions, one per channel.
    #[inline]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Whether this map's channel count agrees with a sample spec.
    pub fn matches(&self, spec: &Spec) -> bool {
        self.channels() == spec.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_stereo_is_left_right() {
        let m = Map::auto(2);
        assert_eq!(m.positions(), &[Position::FrontLeft, Position::FrontRight]);
    }

    #[test]
    fn auto_falls_back_to_aux_numbering() {
        let m = Map::auto(4);
        assert_eq!(m.positions()[3], Position::Aux(3));
    }
}
