// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Error management.
//!
//! Only conditions that a caller (the Sink Facade's client, or the embedding mixing core) must
//! react to are represented here. Transient, silently-recovered device errors (underrun, suspend)
//! are not `Error`s; they are logged and handled internally by the Device Adapter and Scheduler, per
//! the error policy.

use std::fmt;

/// The kind of failure being reported.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Code {
    /// The device negotiated different hardware parameters on resume than it had before suspend.
    NegotiationMismatch,
    /// The device could not be opened at all.
    DeviceOpenFailed,
    /// The device is a modem-class device and cannot be used for playback.
    UnsupportedDevice,
    /// The device reservation bus refused to yield the device to us.
    ReservationBusy,
    /// An internal loop invariant was violated; the I/O thread has asked to be unloaded.
    LoopInvariantViolation,
    /// A lower-level ALSA failure that wasn't one of the recognized transient cases.
    Alsa,
    /// A lower-level OS failure (e.g. `timerfd_create`, `poll`).
    Io,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Code::NegotiationMismatch => "negotiated parameters differ from pre-suspend values",
            Code::DeviceOpenFailed => "device could not be opened",
            Code::UnsupportedDevice => "device is not supported for playback",
            Code::ReservationBusy => "device reservation denied",
            Code::LoopInvariantViolation => "internal loop invariant violated",
            Code::Alsa => "ALSA error",
            Code::Io => "I/O error",
        };
        f.write_str(s)
    }
}

/// The crate's error type: a [`Code`] paired with optional human-readable context.
#[derive(Debug)]
pub struct Error {
    code: Code,
    context: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Constructs an error with no further context.
    pub fn new(code: Code) -> Self {
        Error { code, context: None, source: None }
    }

    /// Constructs an error with a human-readable context string.
    pub fn with_context(code: Code, context: impl Into<String>) -> Self {
        Error { code, context: Some(context.into()), source: None }
    }

    /// The kind of error this is.
    #[inline]
    pub fn code(&self) -> Code {
        self.code
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{}: {}", self.code, ctx),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<alsa::Error> for Error {
    fn from(e: alsa::Error) -> Self {
        Error { code: Code::Alsa, context: Some(e.to_string()), source: Some(Box::new(e)) }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error { code: Code::Io, context: Some(e.to_string()), source: Some(Box::new(e)) }
    }
}

/// This crate's `Result` alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context_when_present() {
        let e = Error::with_context(Code::NegotiationMismatch, "period 44100 != 48000");
        assert!(e.to_string().contains("period 44100"));
    }
}
