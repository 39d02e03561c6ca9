// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Construction-time configuration (spec §6's named options table).
//!
//! Module loading and argument parsing are out of scope (spec §1); this is the plain struct an
//! embedder fills in and hands to [`crate::sink::Sink::new()`].

use crate::proplist::Proplist;
use crate::time::MicroSeconds;

/// How to identify the device to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Open via a channel-mapping profile name, e.g. `"analog-stereo"`. Tried first when both a
    /// mapping and a raw spec are available, per spec §6's `device_id` semantics.
    Mapping(String),
    /// Open via a raw hardware spec string, e.g. `"hw:0,0"`.
    Raw(String),
}

impl Default for DeviceSelector {
    fn default() -> Self {
        DeviceSelector::Raw("default".to_string())
    }
}

/// Construction-time configuration for a sink (spec §6).
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// `sink_name`: explicit registration name. A `None` falls back to `name`, then to a
    /// device-derived default; either explicit form makes name-registration failure an error.
    pub sink_name: Option<String>,
    /// `name`: legacy alias for `sink_name`, same failure policy.
    pub name: Option<String>,
    /// `device` / `device_id`.
    pub device: DeviceSelector,
    /// `fragments`: number of fragments (periods) to request.
    pub fragments: u32,
    /// `fragment_size`: bytes per fragment to request.
    pub fragment_size: u32,
    /// `tsched_buffer_size`: total tsched buffer to request, as a duration of audio (resolved to
    /// a frame count once the negotiated sample spec is known).
    pub tsched_buffer_size: MicroSeconds,
    /// `tsched_buffer_watermark`: initial watermark.
    pub tsched_buffer_watermark: MicroSeconds,
    /// `mmap`: request mmap mode.
    pub mmap: bool,
    /// `tsched`: request timer-based scheduling. Actual eligibility additionally depends on
    /// `mmap` having been obtained and on [`crate::platform`]'s VM/high-res-timer probes; see
    /// [`SinkConfig::resolve_tsched()`].
    pub tsched: bool,
    /// `ignore_dB`: disable dB-scale hardware volume.
    pub ignore_db: bool,
    /// `control`: explicit mixer element name.
    pub control: Option<String>,
    /// `sink_properties`: property-list overrides.
    pub sink_properties: Proplist,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            sink_name: None,
            name: None,
            device: DeviceSelector::default(),
            fragments: 4,
            fragment_size: 0,
            tsched_buffer_size: MicroSeconds::from_secs(2),
            tsched_buffer_watermark: MicroSeconds::from_millis(20),
            mmap: true,
            tsched: true,
            ignore_db: false,
            control: None,
            sink_properties: Proplist::new(),
        }
    }
}

impl SinkConfig {
    /// The effective registration name: `sink_name`, else `name`, else `fallback`.
    pub fn effective_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.sink_name.as_deref().or(self.name.as_deref()).unwrap_or(fallback)
    }

    /// Whether a missing registration name must be treated as a hard error (true whenever the
    /// caller named the sink explicitly rather than relying on a derived default).
    pub fn name_is_explicit(&self) -> bool {
        self.sink_name.is_some() || self.name.is_some()
    }

    /// Resolves whether `tsched` should actually be attempted, folding in the `mmap`
    /// prerequisite and the platform probes (spec §6 / SPEC_FULL §C.3, §C.4).
    pub fn resolve_tsched(&self, got_mmap: bool) -> bool {
        self.tsched
            && got_mmap
            && !crate::platform::running_in_vm()
            && crate::platform::has_high_res_timers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_name_takes_priority_over_name() {
        let cfg = SinkConfig {
            sink_name: Some("a".into()),
            name: Some("b".into()),
            ..SinkConfig::default()
        };
        assert_eq!(cfg.effective_name("fallback"), "a");
    }

    #[test]
    fn falls_back_to_default_when_neither_given() {
        let cfg = SinkConfig::default();
        assert_eq!(cfg.effective_name("fallback"), "fallback");
        assert!(!cfg.name_is_explicit());
    }

    #[test]
    fn tsched_requires_mmap() {
        let cfg = SinkConfig::default();
        assert!(!cfg.resolve_tsched(false));
    }
}
