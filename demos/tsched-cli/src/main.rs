//! Manual smoke-test: opens a real ALSA device and drives a sink from a synthetic sine tone.
//!
//! Not part of the test suite; no CI depends on this running against real hardware.

use std::sync::mpsc;
use std::time::Duration;

use tsched_core::config::{DeviceSelector, SinkConfig};
use tsched_core::device::{DeviceAdapter, PlaybackDevice};
use tsched_core::sample::{Format, Spec};
use tsched_core::scheduler::{MixingSource, Scheduler};
use tsched_core::time::{MicroSeconds, MonotonicTs};
use tsched_core::watermark::{WatermarkController, WatermarkParams};

/// A synthetic 440Hz sine wave, rendered straight to the negotiated sample format.
struct ToneSource {
    spec: Spec,
    phase: f64,
}

impl ToneSource {
    fn new(spec: Spec) -> Self {
        ToneSource { spec, phase: 0.0 }
    }

    fn next_sample(&mut self) -> i16 {
        const FREQ_HZ: f64 = 440.0;
        let value = (self.phase * std::f64::consts::TAU).sin();
        self.phase += FREQ_HZ / self.spec.rate as f64;
        self.phase -= self.phase.floor();
        (value * i16::MAX as f64 * 0.2) as i16
    }
}

impl MixingSource for ToneSource {
    fn render(&mut self, request_bytes: u32) -> Vec<u8> {
        let frame_size = self.spec.frame_size();
        let frames = request_bytes as usize / frame_size;
        let mut out = Vec::with_capacity(frames * frame_size);
        for _ in 0..frames {
            let sample = self.next_sample().to_ne_bytes();
            for _ in 0..self.spec.channels {
                out.extend_from_slice(&sample);
            }
        }
        out
    }

    fn notify_rewound(&mut self, bytes: u32) {
        log::debug!("tone source asked to rewind {} bytes; ignored (stateless generator)", bytes);
    }
}

fn main() {
    env_logger::init();

    let config = SinkConfig {
        device: DeviceSelector::Raw("default".to_string()),
        ..SinkConfig::default()
    };
    let desired = Spec { format: Format::S16NE, rate: 48_000, channels: 2 };

    let desired_buffer_frames =
        (desired.rate as u64 * config.tsched_buffer_size.as_micros() / 1_000_000) as u32;
    let device = match DeviceAdapter::open(
        &config.device,
        desired,
        false,
        1_024,
        desired_buffer_frames,
        config.mmap,
        config.tsched,
    ) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("failed to open device: {}", e);
            std::process::exit(1);
        }
    };

    let negotiated = *device.negotiated();
    let watermark = WatermarkController::new(
        config.tsched_buffer_watermark,
        negotiated.spec.bytes_to_usec(negotiated.buffer.usable_bytes() as u64),
        WatermarkParams::default(),
    );

    let (events_tx, events_rx) = mpsc::channel();
    let mut scheduler = match Scheduler::new(
        device,
        ToneSource::new(negotiated.spec),
        watermark,
        MicroSeconds::from_millis(100),
        events_tx,
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to set up scheduler: {}", e);
            std::process::exit(1);
        }
    };

    println!("playing a 440Hz tone for 3 seconds on {:?}", config.device);
    let deadline = MonotonicTs::now().plus(MicroSeconds::from_secs(3));
    loop {
        let now = MonotonicTs::now();
        if now.elapsed_until(deadline) == MicroSeconds::ZERO {
            break;
        }
        match scheduler.dispatch(tsched_core::watermark::WakeReason::Timer, now) {
            Ok(outcome) => {
                scheduler.prepare_iteration(outcome.next_sleep).ok();
                std::thread::sleep(Duration::from(outcome.next_sleep));
            }
            Err(e) => {
                eprintln!("iteration failed: {}", e);
                break;
            }
        }
        while let Ok(event) = events_rx.try_recv() {
            log::debug!("event: {:?}", event);
        }
    }
}
