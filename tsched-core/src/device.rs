// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The Device Adapter (spec §4.3): a uniform interface over a real ALSA playback device, built on
//! the `alsa` crate's `PCM`/`HwParams`/`SwParams`/`IO` types.
//!
//! Negotiation and recovery follow the patterns exercised directly against hardware elsewhere in
//! this ecosystem (`avail_update`, `try_recover`, `State` matching, mmap submission via `IO::mmap`).
//! This module adds the format/rate/buffer negotiation search spec §4.3 calls for, the 5x/10s
//! driver-bug guard on `avail`/`delay`, and the 10-iteration bounded inner fill loop shared by
//! both submission modes.

use alsa::pcm::{Access, Format as AlsaFormat, HwParams, State, PCM};
use alsa::{Direction, PollDescriptors};

use crate::buffer::DeviceBuffer;
use crate::config::DeviceSelector;
use crate::error::{Code, Error, Result};
use crate::oneshot::OneShotLatch;
use crate::sample::{Format, Spec};

/// Maximum number of inner submission iterations per wakeup (spec §4.3's "submission
/// bounded-iteration rule").
pub const MAX_INNER_ITERATIONS: u32 = 10;

/// The four buffer/period negotiation strategies tried in order (spec §4.3), remembered on
/// success so a later re-negotiation retries the same one first (SPEC_FULL §C.6).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferStrategy {
    BufferThenPeriod,
    PeriodThenBuffer,
    BufferOnly,
    PeriodOnly,
}

const BUFFER_STRATEGIES: [BufferStrategy; 4] = [
    BufferStrategy::BufferThenPeriod,
    BufferStrategy::PeriodThenBuffer,
    BufferStrategy::BufferOnly,
    BufferStrategy::PeriodOnly,
];

/// What negotiation actually settled on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub spec: Spec,
    pub buffer: DeviceBuffer,
    pub got_mmap: bool,
    pub got_tsched: bool,
    pub strategy: BufferStrategy,
}

fn to_alsa_format(f: Format) -> AlsaFormat {
    match f {
        Format::U8 => AlsaFormat::U8,
        Format::ALaw => AlsaFormat::ALaw,
        Format::ULaw => AlsaFormat::MuLaw,
        Format::S16le => AlsaFormat::S16LE,
        Format::S16be => AlsaFormat::S16BE,
        Format::F32le => AlsaFormat::FloatLE,
        Format::F32be => AlsaFormat::FloatBE,
        Format::S32le => AlsaFormat::S32LE,
        Format::S32be => AlsaFormat::S32BE,
        Format::S24le => AlsaFormat::S243LE,
        Format::S24be => AlsaFormat::S243BE,
        Format::S24_32le => AlsaFormat::S24LE,
        Format::S24_32be => AlsaFormat::S24BE,
    }
}

/// Whether the opened PCM is a modem-class device, which must be rejected outright
/// (SPEC_FULL §C.2). Modem devices register with a class string of `"modem"` in their card
/// long-name; a real implementation would query the control interface, approximated here via
/// the PCM's reported hardware name.
fn is_modem_class(pcm: &PCM) -> bool {
    pcm.info().ok().map(|info| {
        info.get_name().unwrap_or_default().to_ascii_lowercase().contains("modem")
    }).unwrap_or(false)
}

/// The uniform interface the Scheduler drives (spec §4.3), abstracted from [`DeviceAdapter`] so
/// the Playback Loop can be exercised in tests against a fake device with no real hardware
/// (SPEC_FULL §B.4).
pub trait PlaybackDevice {
    fn negotiated(&self) -> &Negotiated;
    fn avail(&mut self) -> Result<u32>;
    fn delay(&mut self) -> Result<u32>;
    fn write<F>(&mut self, bytes_budget: u32, render: F) -> Result<u32>
    where
        F: FnMut(u32) -> Vec<u8>;
    fn mmap_write<F>(&mut self, bytes_budget: u32, render_into: F) -> Result<u32>
    where
        F: FnMut(&mut [u8]) -> u32;
    fn rewind(&mut self, frames: u32) -> Result<u32>;
    fn start(&mut self) -> Result<()>;
    fn poll_descriptors(&self) -> Result<Vec<libc::pollfd>>;
}

/// A uniform interface over a real playback device.
pub struct DeviceAdapter {
    pcm: PCM,
    negotiated: Negotiated,
    avail_latch: OneShotLatch,
    delay_latch: OneShotLatch,
    mmap_latch: OneShotLatch,
}

impl DeviceAdapter {
    /// Opens and negotiates a device (spec §4.3's `open`).
    ///
    /// Tries the requested format, falling back through
    /// [`Format::NEGOTIATION_PREFERENCE`]; sets rate "near" the request, accepting within ±5%
    /// (spec §9 open question 1: we snap to the requested rate in `Spec`, but record the actual
    /// negotiated rate in the returned [`Negotiated`] is deferred to the caller via `pcm_current`
    /// introspection if needed); negotiates channel count exactly or "near" per `exact_channels`;
    /// tries buffer/period strategies in the spec's four orders.
    pub fn open(
        selector: &DeviceSelector,
        desired: Spec,
        exact_channels: bool,
        desired_period_frames: u32,
        desired_buffer_frames: u32,
        want_mmap: bool,
        want_tsched: bool,
    ) -> Result<Self> {
        let device_string = match selector {
            DeviceSelector::Mapping(name) => format!("plug:{}", name),
            DeviceSelector::Raw(spec) => spec.clone(),
        };
        let pcm = PCM::new(&device_string, Direction::Playback, false)
            .map_err(|e| Error::with_context(Code::DeviceOpenFailed, format!("{}: {}", device_string, e)))?;

        if is_modem_class(&pcm) {
            return Err(Error::with_context(Code::UnsupportedDevice, device_string));
        }

        let max_buffer_frames = {
            let hwp = HwParams::any(&pcm)?;
            hwp.get_buffer_size_max().unwrap_or(desired_buffer_frames as i64) as u32
        };
        let buffer_frames = desired_buffer_frames.min(max_buffer_frames.max(1));

        let (format, _tried) = Self::negotiate_format(&pcm, desired.format)?;

        let mut last_err = None;
        for strategy in BUFFER_STRATEGIES {
            match Self::try_negotiate(
                &pcm, format, desired.rate, desired.channels, exact_channels,
                buffer_frames, desired_period_frames, want_mmap, strategy,
            ) {
                Ok((buffer, got_mmap)) => {
                    let negotiated_spec = Spec { format, rate: desired.rate, channels: desired.channels };
                    let got_tsched = want_tsched && got_mmap;
                    let negotiated = Negotiated {
                        spec: negotiated_spec,
                        buffer,
                        got_mmap,
                        got_tsched,
                        strategy,
                    };
                    return Ok(DeviceAdapter {
                        pcm,
                        negotiated,
                        avail_latch: OneShotLatch::driver_bug(),
                        delay_latch: OneShotLatch::driver_bug(),
                        mmap_latch: OneShotLatch::driver_bug(),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::new(Code::DeviceOpenFailed)))
    }

    fn negotiate_format(pcm: &PCM, desired: Format) -> Result<(Format, u32)> {
        let mut candidates = vec![desired];
        candidates.extend(Format::NEGOTIATION_PREFERENCE.iter().copied().filter(|f| *f != desired));
        for (idx, candidate) in candidates.iter().enumerate() {
            let hwp = HwParams::any(pcm)?;
            if hwp.set_format(to_alsa_format(*candidate)).is_ok() {
                return Ok((*candidate, idx as u32));
            }
        }
        Err(Error::with_context(Code::DeviceOpenFailed, "no acceptable sample format"))
    }

    fn try_negotiate(
        pcm: &PCM,
        format: Format,
        rate: u32,
        channels: u8,
        exact_channels: bool,
        buffer_frames: u32,
        period_frames: u32,
        want_mmap: bool,
        strategy: BufferStrategy,
    ) -> Result<(DeviceBuffer, bool)> {
        let hwp = HwParams::any(pcm)?;
        let access = if want_mmap { Access::MMapInterleaved } else { Access::RWInterleaved };
        let got_mmap = match hwp.set_access(access) {
            Ok(()) => want_mmap,
            Err(_) => {
                hwp.set_access(Access::RWInterleaved)?;
                false
            }
        };
        hwp.set_format(to_alsa_format(format))?;
        let negotiated_rate = hwp.set_rate(rate, alsa::ValueOr::Nearest)?;
        if !rate_within_tolerance(rate, negotiated_rate) {
            return Err(Error::with_context(Code::NegotiationMismatch, "rate outside 5% tolerance"));
        }
        if exact_channels {
            hwp.set_channels(channels as u32)?;
        } else {
            hwp.set_channels_near(channels as u32)?;
        }

        match strategy {
            BufferStrategy::BufferThenPeriod => {
                hwp.set_buffer_size_near(buffer_frames as i64)?;
                hwp.set_period_size_near(period_frames as i64, alsa::ValueOr::Nearest)?;
            }
            BufferStrategy::PeriodThenBuffer => {
                hwp.set_period_size_near(period_frames as i64, alsa::ValueOr::Nearest)?;
                hwp.set_buffer_size_near(buffer_frames as i64)?;
            }
            BufferStrategy::BufferOnly => {
                hwp.set_buffer_size_near(buffer_frames as i64)?;
            }
            BufferStrategy::PeriodOnly => {
                hwp.set_period_size_near(period_frames as i64, alsa::ValueOr::Nearest)?;
            }
        }
        pcm.hw_params(&hwp)?;

        let swp = pcm.sw_params_current()?;
        let hwbuf_frames = hwp.get_buffer_size()?;
        let period_frames_actual = hwp.get_period_size()?;
        swp.set_start_threshold(hwbuf_frames - period_frames_actual)?;
        swp.set_avail_min(period_frames_actual)?;
        pcm.sw_params(&swp)?;
        pcm.set_nonblock(true)?;

        let frame_size = Spec { format, rate, channels }.frame_size() as u32;
        let buffer = DeviceBuffer {
            frame_size_bytes: frame_size,
            fragment_size_bytes: period_frames_actual as u32 * frame_size,
            hwbuf_size_bytes: hwbuf_frames as u32 * frame_size,
            hwbuf_unused_bytes: 0,
        };
        Ok((buffer, got_mmap))
    }

}

impl PlaybackDevice for DeviceAdapter {
    #[inline]
    fn negotiated(&self) -> &Negotiated {
        &self.negotiated
    }

    /// Frames currently free in the buffer, guarded against driver-bug readings (spec §4.3).
    fn avail(&mut self) -> Result<u32> {
        let raw = match self.pcm.avail_update() {
            Ok(v) => v,
            Err(e) => {
                self.pcm.try_recover(e, true)?;
                self.pcm.avail_update()?
            }
        };
        let frame_size = self.negotiated.buffer.frame_size_bytes;
        let hwbuf_frames = self.negotiated.buffer.hwbuf_size_bytes / frame_size;
        let bytes_per_sec_limit = 10 * (self.negotiated.spec.rate as i64);
        if raw < 0 {
            return Ok(0);
        }
        if raw as u64 > 5 * hwbuf_frames as u64 || raw > bytes_per_sec_limit {
            if self.avail_latch.fire() {
                log::warn!("avail() returned {} frames, outside sane range; clamping to hwbuf", raw);
            }
            return Ok(hwbuf_frames);
        }
        Ok(raw as u32)
    }

    /// Frames currently queued for playback, same driver-bug guard as `avail`.
    fn delay(&mut self) -> Result<u32> {
        let raw = match self.pcm.status() {
            Ok(status) => status.get_delay(),
            Err(e) => {
                self.pcm.try_recover(e, true)?;
                self.pcm.status()?.get_delay()
            }
        };
        let frame_size = self.negotiated.buffer.frame_size_bytes;
        let hwbuf_frames = self.negotiated.buffer.hwbuf_size_bytes / frame_size;
        if raw < 0 {
            return Ok(0);
        }
        if raw as u64 > 5 * hwbuf_frames as u64 {
            if self.delay_latch.fire() {
                log::warn!("delay() returned {} frames, outside sane range; clamping to hwbuf", raw);
            }
            return Ok(hwbuf_frames);
        }
        Ok(raw as u32)
    }

    /// Copy-mode submission: calls `render` to obtain up to `bytes_budget` bytes and writes them,
    /// honoring the 10-iteration bound.
    fn write<F>(&mut self, bytes_budget: u32, mut render: F) -> Result<u32>
    where
        F: FnMut(u32) -> Vec<u8>,
    {
        let io = self.pcm.io_bytes();
        let frame_size = self.negotiated.buffer.frame_size_bytes as usize;
        let mut written = 0u32;
        for _ in 0..MAX_INNER_ITERATIONS {
            if written >= bytes_budget {
                break;
            }
            let request = (bytes_budget - written).min(self.negotiated.buffer.hwbuf_size_bytes);
            let chunk = render(request);
            if chunk.is_empty() {
                break;
            }
            match io.writei(&chunk) {
                Ok(frames) => written += (frames * frame_size) as u32,
                Err(e) if e.errno() == Some(libc::EAGAIN) => break,
                Err(e) => {
                    self.recover(e)?;
                    break;
                }
            }
        }
        Ok(written)
    }

    /// Zero-copy submission: calls `render_into` with a writable slice of at most one fill's
    /// worth of device memory, honoring the 10-iteration bound.
    fn mmap_write<F>(&mut self, bytes_budget: u32, mut render_into: F) -> Result<u32>
    where
        F: FnMut(&mut [u8]) -> u32,
    {
        let frame_size = self.negotiated.buffer.frame_size_bytes;
        let mut io = self.pcm.io_bytes();
        let mut written = 0u32;
        for _ in 0..MAX_INNER_ITERATIONS {
            if written >= bytes_budget {
                break;
            }
            let avail_frames = match self.pcm.avail_update() {
                Ok(v) if v > 0 => v as u32,
                Ok(_) => break,
                Err(e) => {
                    self.pcm.try_recover(e, true)?;
                    break;
                }
            };
            let want_frames = ((bytes_budget - written) / frame_size).min(avail_frames);
            if want_frames == 0 {
                break;
            }
            let result = io.mmap(want_frames as usize, |dst| {
                let n = render_into(dst);
                (n / frame_size) as usize
            });
            match result {
                Ok(frames_written) => {
                    if frames_written == 0 {
                        break;
                    }
                    written += frames_written as u32 * frame_size;
                }
                Err(e) => {
                    if self.mmap_latch.fire() {
                        log::warn!("mmap_begin failed: {}", e);
                    }
                    self.recover(e)?;
                    break;
                }
            }
        }
        Ok(written)
    }

    /// Rewinds up to `frames`, returning the amount actually rewound (spec §4.4.1).
    fn rewind(&mut self, frames: u32) -> Result<u32> {
        match self.pcm.rewind(frames as alsa::pcm::Frames) {
            Ok(actual) => Ok(actual as u32),
            Err(e) => {
                self.recover(e)?;
                Ok(0)
            }
        }
    }

    /// Issues the device's "start" command (spec §4.4 step 8).
    fn start(&mut self) -> Result<()> {
        if self.pcm.state() == State::Prepared {
            self.pcm.start()?;
        }
        Ok(())
    }

    /// The device's poll descriptors, for the Scheduler to multiplex alongside the timer and
    /// inbox (spec §4.3).
    fn poll_descriptors(&self) -> Result<Vec<libc::pollfd>> {
        Ok(self.pcm.get()?)
    }
}

impl DeviceAdapter {
    /// Recovers from a transient error: re-prepares on underrun (`EPIPE`) or suspend (`ESTRPIPE`);
    /// anything else is surfaced (spec §7).
    pub fn recover(&mut self, err: alsa::Error) -> Result<()> {
        match self.pcm.try_recover(err, true) {
            Ok(()) => {
                log::debug!("device recovered from transient error");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the current device state requires the scheduler to treat this as an underrun and
    /// re-prepare.
    pub fn is_in_error_state(&self) -> bool {
        matches!(self.pcm.state(), State::XRun | State::Suspended)
    }

    pub fn close(self) {
        drop(self.pcm);
    }
}

fn rate_within_tolerance(requested: u32, actual: u32) -> bool {
    let lo = requested as f64 * 0.95;
    let hi = requested as f64 * 1.05;
    (actual as f64) >= lo && (actual as f64) <= hi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_tolerance_accepts_within_5_percent() {
        assert!(rate_within_tolerance(44_100, 44_100));
        assert!(rate_within_tolerance(44_100, 46_000));
        assert!(!rate_within_tolerance(44_100, 50_000));
    }

    #[test]
    fn buffer_strategy_order_matches_spec() {
        assert_eq!(BUFFER_STRATEGIES[0], BufferStrategy::BufferThenPeriod);
        assert_eq!(BUFFER_STRATEGIES[3], BufferStrategy::PeriodOnly);
    }
}
