//! End-to-end exercises of the Playback Loop (spec §8's numbered scenarios) against a fake
//! device, so the scheduling algorithm is verified without a real sound card (SPEC_FULL §B.4).
//!
//! All scenarios use spec §8's literal fixture: 48kHz stereo s16, frame_size = 4 bytes,
//! hwbuf = 2s = 384,000 bytes (96,000 frames).

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::mpsc;

use tsched_core::buffer::DeviceBuffer;
use tsched_core::device::{BufferStrategy, Negotiated, PlaybackDevice};
use tsched_core::error::Result;
use tsched_core::message::Message;
use tsched_core::sample::{Format, Spec};
use tsched_core::scheduler::{MixingSource, Scheduler};
use tsched_core::time::{MicroSeconds, MonotonicTs};
use tsched_core::watermark::{WakeReason, WatermarkController, WatermarkParams};

const FRAME_SIZE: u32 = 4;
const HWBUF_BYTES: u32 = 384_000;
const HWBUF_FRAMES: u32 = HWBUF_BYTES / FRAME_SIZE;

fn stereo_48k_s16() -> Spec {
    Spec { format: Format::S16le, rate: 48_000, channels: 2 }
}

fn negotiated(hwbuf_unused_bytes: u32, got_mmap: bool) -> Negotiated {
    Negotiated {
        spec: stereo_48k_s16(),
        buffer: DeviceBuffer {
            frame_size_bytes: FRAME_SIZE,
            fragment_size_bytes: HWBUF_BYTES / 2,
            hwbuf_size_bytes: HWBUF_BYTES,
            hwbuf_unused_bytes,
        },
        got_mmap,
        got_tsched: true,
        strategy: BufferStrategy::BufferThenPeriod,
    }
}

/// A scripted fake device: `avail`/`delay` return whatever the test last set, and every
/// submission is appended to a shared buffer the test can inspect after the scheduler moves on.
struct FakeDevice {
    negotiated: Negotiated,
    avail_frames: Rc<Cell<u32>>,
    delay_frames: Rc<Cell<u32>>,
    written: Rc<RefCell<Vec<u8>>>,
    start_calls: Rc<Cell<u32>>,
    rewind_requests: Rc<RefCell<Vec<u32>>>,
    rewind_grant: Rc<Cell<u32>>,
}

impl PlaybackDevice for FakeDevice {
    fn negotiated(&self) -> &Negotiated {
        &self.negotiated
    }

    fn avail(&mut self) -> Result<u32> {
        Ok(self.avail_frames.get())
    }

    fn delay(&mut self) -> Result<u32> {
        Ok(self.delay_frames.get())
    }

    fn write<F>(&mut self, bytes_budget: u32, mut render: F) -> Result<u32>
    where
        F: FnMut(u32) -> Vec<u8>,
    {
        let chunk = render(bytes_budget);
        let n = chunk.len() as u32;
        self.written.borrow_mut().extend(chunk);
        Ok(n)
    }

    fn mmap_write<F>(&mut self, bytes_budget: u32, mut render_into: F) -> Result<u32>
    where
        F: FnMut(&mut [u8]) -> u32,
    {
        let mut buf = vec![0u8; bytes_budget as usize];
        let n = render_into(&mut buf);
        self.written.borrow_mut().extend_from_slice(&buf[..n as usize]);
        Ok(n)
    }

    fn rewind(&mut self, frames: u32) -> Result<u32> {
        self.rewind_requests.borrow_mut().push(frames);
        Ok(self.rewind_grant.get().min(frames))
    }

    fn start(&mut self) -> Result<()> {
        self.start_calls.set(self.start_calls.get() + 1);
        Ok(())
    }

    fn poll_descriptors(&self) -> Result<Vec<libc::pollfd>> {
        Ok(Vec::new())
    }
}

/// A mixing source that fills every requested byte with a fixed pattern, so submitted length is
/// easy to assert on independent of content.
struct FillSource {
    rewound: Rc<Cell<u32>>,
}

impl MixingSource for FillSource {
    fn render(&mut self, request_bytes: u32) -> Vec<u8> {
        vec![0xAA; request_bytes as usize]
    }

    fn notify_rewound(&mut self, bytes: u32) {
        self.rewound.set(bytes);
    }
}

struct Harness {
    scheduler: Scheduler<FakeDevice, FillSource>,
    avail_frames: Rc<Cell<u32>>,
    delay_frames: Rc<Cell<u32>>,
    written: Rc<RefCell<Vec<u8>>>,
    start_calls: Rc<Cell<u32>>,
    rewind_requests: Rc<RefCell<Vec<u32>>>,
    rewind_grant: Rc<Cell<u32>>,
    rewound_notified: Rc<Cell<u32>>,
}

fn harness(hwbuf_unused_bytes: u32, initial_watermark: MicroSeconds) -> Harness {
    let avail_frames = Rc::new(Cell::new(HWBUF_FRAMES));
    let delay_frames = Rc::new(Cell::new(0));
    let written = Rc::new(RefCell::new(Vec::new()));
    let start_calls = Rc::new(Cell::new(0));
    let rewind_requests = Rc::new(RefCell::new(Vec::new()));
    let rewind_grant = Rc::new(Cell::new(u32::MAX));
    let rewound_notified = Rc::new(Cell::new(0));

    let device = FakeDevice {
        negotiated: negotiated(hwbuf_unused_bytes, false),
        avail_frames: avail_frames.clone(),
        delay_frames: delay_frames.clone(),
        written: written.clone(),
        start_calls: start_calls.clone(),
        rewind_requests: rewind_requests.clone(),
        rewind_grant: rewind_grant.clone(),
    };
    let source = FillSource { rewound: rewound_notified.clone() };
    let watermark = WatermarkController::new(
        initial_watermark,
        stereo_48k_s16().bytes_to_usec((HWBUF_BYTES - hwbuf_unused_bytes) as u64),
        WatermarkParams::default(),
    );
    let (events_tx, _events_rx) = mpsc::channel();
    let scheduler = Scheduler::new(
        device,
        source,
        watermark,
        MicroSeconds::from_secs(2),
        events_tx,
    )
    .expect("constructing a scheduler needs only timerfd/eventfd, not a sound card");

    Harness {
        scheduler,
        avail_frames,
        delay_frames,
        written,
        start_calls,
        rewind_requests,
        rewind_grant,
        rewound_notified,
    }
}

#[test]
fn scenario_1_clean_start_up_fills_the_whole_buffer() {
    // spec §8 scenario 1: avail() reports the full hwbuf free; the loop fills it entirely,
    // issues the start command on first submission, and arms the next sleep near hwbuf-watermark.
    let mut h = harness(0, MicroSeconds::from_millis(20));
    let now = MonotonicTs::now();

    let outcome = h.scheduler.dispatch(WakeReason::Timer, now).unwrap();

    assert_eq!(outcome.bytes_submitted, HWBUF_BYTES);
    assert_eq!(h.written.borrow().len(), HWBUF_BYTES as usize);
    assert_eq!(h.start_calls.get(), 1);
    // Watermark itself should not move on a clean, first-ever iteration.
    assert_eq!(outcome.watermark, MicroSeconds::from_millis(20));
    // Next sleep should land near hwbuf - watermark (~1.98s), not overshoot past it.
    assert!(outcome.next_sleep <= MicroSeconds::from_millis(1_980));
}

#[test]
fn scenario_2_underrun_raises_watermark_and_reports_zero_left_to_play() {
    // spec §8 scenario 2: a first clean iteration clears `first`, then avail() reports more than
    // hwbuf is worth (100,001 frames against a 96,000-frame hwbuf) — an underrun.
    let mut h = harness(0, MicroSeconds::from_millis(20));
    let t0 = MonotonicTs::now();
    h.scheduler.dispatch(WakeReason::Timer, t0).unwrap();

    h.avail_frames.set(100_001);
    let t1 = t0.plus(MicroSeconds::from_millis(1_980));
    let outcome = h.scheduler.dispatch(WakeReason::Timer, t1).unwrap();

    assert_eq!(outcome.watermark, MicroSeconds::from_millis(30));
}

#[test]
fn scenario_4_rewind_is_bounded_by_watermark_and_unused_and_device_may_grant_less() {
    // spec §8 scenario 4: requested rewind of 200,000B against watermark=20ms (3,840B) and
    // unused=0 allows up to 380,160B, but the device only grants 100,000B back.
    let mut h = harness(0, MicroSeconds::from_millis(20));
    let t0 = MonotonicTs::now();
    h.scheduler.dispatch(WakeReason::Timer, t0).unwrap();
    let submitted_before = h.written.borrow().len() as u32;

    h.rewind_grant.set(100_000 / FRAME_SIZE);
    let (tx, rx) = mpsc::sync_channel(4);
    tx.send(Message::Rewind { bytes: 200_000 }).unwrap();
    let pending = h.scheduler.drain_inbox(&rx);
    assert!(pending.is_empty(), "the rewind message is staged internally, not returned");
    drop(tx);

    let t1 = t0.plus(MicroSeconds::from_millis(1_980));
    h.scheduler.dispatch(WakeReason::Timer, t1).unwrap();

    let requests = h.rewind_requests.borrow();
    assert_eq!(requests.len(), 1);
    let requested_frames = requests[0];
    let requested_bytes = requested_frames * FRAME_SIZE;
    assert!(requested_bytes <= 380_160, "rewind request must not exceed hwbuf - watermark - unused");
    assert_eq!(h.rewound_notified.get(), 100_000, "the source is notified of the actually-rewound amount");
    let _ = submitted_before;
}

#[test]
fn multiple_pending_rewinds_coalesce_to_the_largest_before_the_device_ever_sees_them() {
    // spec §5's ordering guarantee: several rewinds queued before the next iteration collapse to
    // one request for the largest.
    let mut h = harness(0, MicroSeconds::from_millis(20));
    let t0 = MonotonicTs::now();
    h.scheduler.dispatch(WakeReason::Timer, t0).unwrap();

    let (tx, rx) = mpsc::sync_channel(8);
    tx.send(Message::Rewind { bytes: 1_000 }).unwrap();
    tx.send(Message::Rewind { bytes: 50_000 }).unwrap();
    tx.send(Message::Rewind { bytes: 9_000 }).unwrap();
    h.scheduler.drain_inbox(&rx);
    drop(tx);

    let t1 = t0.plus(MicroSeconds::from_millis(1_980));
    h.scheduler.dispatch(WakeReason::Timer, t1).unwrap();

    let requests = h.rewind_requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0] * FRAME_SIZE, 50_000);
}

#[test]
fn a_full_iteration_never_submits_more_than_hwbuf_minus_unused() {
    // invariant 4.
    let hwbuf_unused = 40_000;
    let mut h = harness(hwbuf_unused, MicroSeconds::from_millis(20));
    let now = MonotonicTs::now();

    let outcome = h.scheduler.dispatch(WakeReason::Timer, now).unwrap();

    assert!(outcome.bytes_submitted <= HWBUF_BYTES - hwbuf_unused);
}

#[test]
fn below_the_unused_reserve_the_loop_submits_nothing() {
    // spec §4.4 step 6: if n_bytes <= hwbuf_unused, there is nothing to do this cycle.
    let hwbuf_unused = 40_000;
    let mut h = harness(hwbuf_unused, MicroSeconds::from_millis(20));
    h.avail_frames.set(hwbuf_unused / FRAME_SIZE);
    let now = MonotonicTs::now();

    let outcome = h.scheduler.dispatch(WakeReason::Timer, now).unwrap();

    assert_eq!(outcome.bytes_submitted, 0);
    assert!(h.written.borrow().is_empty());
    let _ = h.delay_frames.get();
}

#[test]
fn timer_wake_on_an_already_full_buffer_breaks_without_writing() {
    // spec §4.4 step 5: woken by the timer, with the buffer already fuller than
    // process_usec + sleep_usec/2 needs, the loop must break without submitting anything.
    let mut h = harness(0, MicroSeconds::from_millis(20));
    // Only 1,000 frames free: left_to_play is almost the whole hwbuf, far above threshold.
    h.avail_frames.set(1_000);
    let now = MonotonicTs::now();

    let outcome = h.scheduler.dispatch(WakeReason::Timer, now).unwrap();

    assert_eq!(outcome.bytes_submitted, 0);
    assert!(h.written.borrow().is_empty());
}

#[test]
fn poll_wake_on_the_same_buffer_state_still_writes() {
    // spec §4.4 step 5's guard applies only to a timer wake ("if not woken by poll"); a
    // poll/message wake must still fill, even with the same near-full buffer as above.
    let mut h = harness(0, MicroSeconds::from_millis(20));
    h.avail_frames.set(1_000);
    let now = MonotonicTs::now();

    let outcome = h.scheduler.dispatch(WakeReason::Poll, now).unwrap();

    assert_eq!(outcome.bytes_submitted, 1_000 * FRAME_SIZE);
    assert_eq!(h.written.borrow().len(), (1_000 * FRAME_SIZE) as usize);
}
