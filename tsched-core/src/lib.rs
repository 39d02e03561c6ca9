// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! A timer-scheduled playback sink driver.
//!
//! # About
//!
//! This crate bridges an in-process audio mixing core to a real ALSA playback device. Its job is
//! to pull mixed PCM frames from the core at precisely timed intervals and deliver them such that
//! the output buffer never underruns, wakeups are as infrequent as the hardware allows, and the
//! achievable end-to-end latency is dynamically adjustable by clients.
//!
//! # Components
//!
//! Five cooperating pieces, listed leaves-first:
//!
//! - [`smoother`] — the Clock Smoother: fuses noisy soundcard timestamps with the monotonic
//!   system clock.
//! - [`watermark`] — the Watermark Controller: the adaptive wake-early safety margin.
//! - [`device`] — the Device Adapter: a uniform interface over a real ALSA device.
//! - [`scheduler`] — the Playback Loop: the single-threaded I/O actor and its rewind protocol.
//! - [`sink`] — the Sink Facade: the object handed to the mixing core and control-plane callers.
//!
//! Everything else in this crate (`error`, `time`, `sample`, `channelmap`, `volume`, `proplist`,
//! `buffer`, `config`, `platform`, `oneshot`, `mixer`, `message`, `event`) is the data model and
//! ambient support those five are built from.

pub mod buffer;
pub mod channelmap;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod message;
pub mod mixer;
pub mod oneshot;
pub mod platform;
pub mod proplist;
pub mod sample;
pub mod scheduler;
pub mod sink;
pub mod smoother;
pub mod time;
pub mod volume;
pub mod watermark;

pub use error::{Error, Result};
