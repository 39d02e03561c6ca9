// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Raw OS primitives the playback scheduler needs that the `alsa` crate does not already cover:
//! a `timerfd`-backed deadline timer, real-time scheduling priority, and the `pollfd` plumbing
//! used to multiplex the timer and an inbox eventfd alongside a device's own poll descriptors.
//!
//! This is the only crate in the workspace where `unsafe` appears outside device mmap handling,
//! mirroring the role the teacher's `pulse-sys` crate plays for the safe binding above it.

pub mod eventfd;
pub mod sched;
pub mod timerfd;

pub use eventfd::EventFd;
pub use sched::set_realtime_priority;
pub use timerfd::TimerFd;
