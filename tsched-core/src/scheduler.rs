// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The Playback Loop / Scheduler (spec §4.4): the single-threaded I/O actor. Owns the device
//! handle, the Clock Smoother, the Watermark Controller, and the write cursor; everything else
//! touches it only through the message inbox.
//!
//! The multiplexed wait follows the teacher's `mainloop::standard` prepare/poll/dispatch shape:
//! [`Scheduler::prepare_iteration`], [`Scheduler::poll_once`], [`Scheduler::dispatch`].

use std::sync::mpsc::{Receiver, TryRecvError};

use crate::buffer::WriteCursor;
use crate::device::PlaybackDevice;
use crate::error::Result;
use crate::event::{DriverBugKind, SinkEvent};
use crate::message::{coalesce, Message};
use crate::oneshot::OneShotLatch;
use crate::smoother::Smoother;
use crate::time::{MicroSeconds, MonotonicTs};
use crate::watermark::{WakeReason, WatermarkController, WatermarkDecision};

/// A mixing source: called by the loop to render up to `request_bytes` of audio.
///
/// Returns fewer bytes than requested only when the source genuinely has nothing more to give
/// right now (e.g. every connected stream is corked); that is not an error.
pub trait MixingSource {
    /// Copy-mode rendering: returns a freshly rendered chunk, at most `request_bytes` long.
    fn render(&mut self, request_bytes: u32) -> Vec<u8>;

    /// mmap-mode rendering: writes directly into `dst`, returning the number of bytes written.
    fn render_into(&mut self, dst: &mut [u8]) -> u32 {
        let chunk = self.render(dst.len() as u32);
        let n = chunk.len().min(dst.len());
        dst[..n].copy_from_slice(&chunk[..n]);
        n as u32
    }

    /// Notified after a successful rewind so the source can replay its own state machine from
    /// the new position.
    fn notify_rewound(&mut self, bytes: u32);
}

/// The outcome of one call to [`Scheduler::run_iteration()`], used by the Sink Facade to decide
/// whether to re-arm after a wakeup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IterationOutcome {
    pub bytes_submitted: u32,
    pub next_sleep: MicroSeconds,
    pub watermark: MicroSeconds,
}

/// The single-threaded I/O actor (spec §4.4).
///
/// Generic over the device so the loop's algorithm can be exercised in tests against a fake
/// [`crate::device::PlaybackDevice`] with no real hardware (SPEC_FULL §B.4); `D` is
/// [`crate::device::DeviceAdapter`] in production.
pub struct Scheduler<D: PlaybackDevice, S: MixingSource> {
    device: D,
    source: S,
    smoother: Smoother,
    watermark: WatermarkController,
    cursor: WriteCursor,
    requested_latency: MicroSeconds,
    poll_unused_latch: OneShotLatch,
    events: std::sync::mpsc::Sender<SinkEvent>,
    pending_rewind: Option<u32>,
    /// Timestamp the scheduler was constructed at; `now - origin` gives the watermark
    /// controller's notion of "now" in [`MicroSeconds`] without assuming access to wall time.
    origin: MonotonicTs,
    timer: tsched_sys::TimerFd,
    /// Signaled by the inbox's `Sender` side (via `InboxHandle::send`, which wraps this) so a
    /// message arrival wakes the same `poll(2)` call as the timer and device descriptors.
    inbox_signal: tsched_sys::EventFd,
}

impl<D: PlaybackDevice, S: MixingSource> Scheduler<D, S> {
    pub fn new(
        device: D,
        source: S,
        watermark: WatermarkController,
        requested_latency: MicroSeconds,
        events: std::sync::mpsc::Sender<SinkEvent>,
    ) -> Result<Self> {
        Ok(Scheduler {
            device,
            source,
            smoother: Smoother::new(),
            watermark,
            cursor: WriteCursor::fresh(),
            requested_latency,
            poll_unused_latch: OneShotLatch::driver_bug(),
            events,
            pending_rewind: None,
            origin: MonotonicTs::now(),
            timer: tsched_sys::TimerFd::new()?,
            inbox_signal: tsched_sys::EventFd::new()?,
        })
    }

    /// A descriptor the inbox's producer side should signal on every send, so a message arrival
    /// wakes [`Scheduler::poll_once()`] alongside the timer and device descriptors.
    pub fn inbox_signal_fd(&self) -> std::os::unix::io::RawFd {
        use std::os::unix::io::AsRawFd;
        self.inbox_signal.as_raw_fd()
    }

    /// Arms the deadline timer for the next wakeup (spec §4.4 step 11). Named to match the
    /// prepare/poll/dispatch phases this module's main loop follows.
    pub fn prepare_iteration(&self, sleep: MicroSeconds) -> Result<()> {
        self.arm_timer(sleep)
    }

    /// Runs one iteration and reports its outcome; the dispatch phase of the main loop.
    pub fn dispatch(&mut self, woken_by: WakeReason, now: MonotonicTs) -> Result<IterationOutcome> {
        self.run_iteration(woken_by, now)
    }

    /// Arms the deadline timer for the next wakeup (spec §4.4 step 11).
    fn arm_timer(&self, sleep: MicroSeconds) -> Result<()> {
        self.timer.arm_oneshot(std::time::Duration::from(sleep))?;
        Ok(())
    }

    /// Disarms the timer; used when the device is not open (spec §4.4: "If state is not open,
    /// disable the timer and just poll the inbox.").
    pub fn disarm_timer(&self) -> Result<()> {
        self.timer.disarm()?;
        Ok(())
    }

    /// Blocks until the timer, the inbox signal, or a device descriptor becomes ready, or
    /// `timeout` elapses. Returns which woke the loop, consuming the timer/inbox counters as
    /// `timerfd(2)`/`eventfd(2)` require.
    pub fn poll_once(&mut self, timeout: MicroSeconds) -> Result<WakeReason> {
        use std::os::unix::io::AsRawFd;

        let mut fds = self.device.poll_descriptors()?;
        let timer_idx = fds.len();
        fds.push(libc::pollfd { fd: self.timer.as_raw_fd(), events: libc::POLLIN, revents: 0 });
        let inbox_idx = fds.len();
        fds.push(libc::pollfd { fd: self.inbox_signal.as_raw_fd(), events: libc::POLLIN, revents: 0 });

        let timeout_ms = (timeout.as_millis() as i32).max(0);
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        if fds[timer_idx].revents & libc::POLLIN != 0 {
            self.timer.consume_expirations()?;
            return Ok(WakeReason::Timer);
        }
        if fds[inbox_idx].revents & libc::POLLIN != 0 {
            self.inbox_signal.consume()?;
            return Ok(WakeReason::Poll);
        }
        Ok(WakeReason::Poll)
    }

    /// Drains and coalesces pending inbox messages without blocking, applying any that this
    /// module owns directly (rewind requests are staged; everything else is returned to the
    /// caller, which is [`crate::sink::Sink`], to apply against the data model).
    pub fn drain_inbox(&mut self, inbox: &Receiver<Message>) -> Vec<Message> {
        let mut pending = Vec::new();
        loop {
            match inbox.try_recv() {
                Ok(msg) => pending.push(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    pending.push(Message::Shutdown);
                    break;
                }
            }
        }
        let pending = coalesce(pending);
        let mut rest = Vec::with_capacity(pending.len());
        for msg in pending {
            match msg {
                Message::Rewind { bytes } => {
                    self.pending_rewind = Some(self.pending_rewind.map_or(bytes, |b| b.max(bytes)));
                }
                other => rest.push(other),
            }
        }
        rest
    }

    /// Runs one full iteration of the loop's main algorithm (spec §4.4, steps 1-12).
    pub fn run_iteration(&mut self, woken_by: WakeReason, now: MonotonicTs) -> Result<IterationOutcome> {
        if let Some(requested) = self.pending_rewind.take() {
            self.do_rewind(requested)?;
        }

        let buffer = self.device.negotiated().buffer;
        let watermark_bytes = self.micros_to_bytes(self.watermark.watermark());
        let (sleep_usec, process_usec) = self.split_latency_budget(watermark_bytes);

        let avail_frames = self.device.avail()?;
        let n_bytes = avail_frames * buffer.frame_size_bytes;

        let (left_to_play, underrun) = if n_bytes <= buffer.hwbuf_size_bytes {
            (buffer.hwbuf_size_bytes - n_bytes, false)
        } else {
            (0, true)
        };

        let decision = self.watermark.on_iteration(
            self.bytes_to_micros(left_to_play),
            woken_by,
            underrun,
            self.cursor.is_first() || self.cursor.is_after_rewind(),
            self.origin.elapsed_until(now),
        );
        self.report_watermark_decision(&decision);

        if woken_by == WakeReason::Timer {
            let threshold = process_usec + sleep_usec.halved();
            if self.bytes_to_micros(left_to_play) > threshold {
                return Ok(self.outcome(0, sleep_usec));
            }
        }

        if n_bytes <= buffer.hwbuf_unused_bytes {
            if woken_by == WakeReason::Poll && self.poll_unused_latch.fire() {
                log::warn!("poll-out wake but device reports no room in buffer");
                let _ = self.events.send(SinkEvent::DriverBugObserved {
                    kind: DriverBugKind::Avail,
                    value: n_bytes as u64,
                });
            }
            return Ok(self.outcome(0, sleep_usec));
        }

        let budget = n_bytes - buffer.hwbuf_unused_bytes;
        let submitted = self.submit(budget)?;

        if self.cursor.is_first() && submitted > 0 {
            self.device.start()?;
            self.smoother.resume(now, false);
        }
        self.cursor.submit(submitted as u64);

        let delay_frames = self.device.delay()?;
        let played_time = self.bytes_to_micros(
            buffer.hwbuf_size_bytes.saturating_sub(delay_frames * buffer.frame_size_bytes),
        );
        self.smoother.put(now, played_time);

        let mut effective_sleep = sleep_usec;
        if self.cursor.since_start() < buffer.hwbuf_size_bytes as u64 {
            effective_sleep = effective_sleep.halved();
        }

        let cusec = self.smoother.translate(now, effective_sleep);
        let next_sleep = effective_sleep.min(cusec);

        self.cursor.clear_iteration_flags();

        Ok(self.outcome(submitted, next_sleep))
    }

    fn submit(&mut self, budget: u32) -> Result<u32> {
        if self.device.negotiated().got_mmap {
            let source = &mut self.source;
            self.device.mmap_write(budget, |dst| source.render_into(dst))
        } else {
            let source = &mut self.source;
            self.device.write(budget, |req| source.render(req))
        }
    }

    /// The rewind protocol (spec §4.4.1).
    fn do_rewind(&mut self, requested: u32) -> Result<u32> {
        let buffer = self.device.negotiated().buffer;
        let watermark_bytes = self.micros_to_bytes(self.watermark.watermark());
        let rewindable = buffer.hwbuf_size_bytes
            .saturating_sub(watermark_bytes + buffer.hwbuf_unused_bytes);
        let to_request = requested.min(rewindable);
        let actual = match self.device.rewind(to_request / buffer.frame_size_bytes) {
            Ok(frames) => frames * buffer.frame_size_bytes,
            Err(_) => 0,
        };
        self.cursor.apply_rewind(actual as u64);
        self.source.notify_rewound(actual);
        Ok(actual)
    }

    fn split_latency_budget(&self, watermark_bytes: u32) -> (MicroSeconds, MicroSeconds) {
        let watermark_usec = self.bytes_to_micros(watermark_bytes);
        if watermark_usec > self.requested_latency {
            let half = watermark_usec.halved();
            (half, half)
        } else {
            (self.requested_latency.saturating_sub(watermark_usec), watermark_usec)
        }
    }

    fn report_watermark_decision(&self, decision: &WatermarkDecision) {
        log::info!("watermark now {}", decision.watermark);
        let _ = self.events.send(SinkEvent::WatermarkChanged { bytes: self.micros_to_bytes(decision.watermark) as u64 });
        if decision.saturated {
            let _ = self.events.send(SinkEvent::WatermarkSaturated);
        }
    }

    fn bytes_to_micros(&self, bytes: u32) -> MicroSeconds {
        self.device.negotiated().spec.bytes_to_usec(bytes as u64)
    }

    fn micros_to_bytes(&self, usec: MicroSeconds) -> u32 {
        self.device.negotiated().spec.usec_to_bytes(usec) as u32
    }

    fn outcome(&self, submitted: u32, next_sleep: MicroSeconds) -> IterationOutcome {
        IterationOutcome { bytes_submitted: submitted, next_sleep, watermark: self.watermark.watermark() }
    }

    /// Handles entry into SUSPENDED: pauses the smoother; the device itself is closed by the
    /// caller, which owns the `DeviceAdapter`'s lifetime across suspend/resume (spec §3's
    /// "device handle exists only when state ∈ {INIT, IDLE, RUNNING}").
    pub fn on_suspend(&mut self, now: MonotonicTs) {
        self.smoother.pause(now);
    }

    /// Handles resume: resets the cursor and smoother discontinuity (spec §4.4: "reset smoother;
    /// first ← true, since_start ← 0").
    pub fn on_resume(&mut self, now: MonotonicTs) {
        self.cursor.restart();
        self.smoother.reset(now, true);
    }
}
