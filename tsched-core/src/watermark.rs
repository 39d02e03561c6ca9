// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! The Watermark Controller (spec §4.2): chooses the wake-early safety margin, raising it eagerly
//! on trouble and lowering it only after a verified period of health.

use crate::time::MicroSeconds;

/// Why the current loop iteration woke up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WakeReason {
    /// The armed timer fired.
    Timer,
    /// A device poll descriptor or the inbox became ready.
    Poll,
}

/// Tunable defaults from spec §4.2.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WatermarkParams {
    pub inc_step: MicroSeconds,
    pub dec_step: MicroSeconds,
    pub inc_threshold: MicroSeconds,
    pub dec_threshold: MicroSeconds,
    pub verify_after: MicroSeconds,
    pub min_sleep: MicroSeconds,
    pub min_wakeup: MicroSeconds,
}

impl Default for WatermarkParams {
    fn default() -> Self {
        WatermarkParams {
            inc_step: MicroSeconds::from_millis(10),
            dec_step: MicroSeconds::from_millis(5),
            inc_threshold: MicroSeconds::ZERO,
            dec_threshold: MicroSeconds::from_millis(100),
            verify_after: MicroSeconds::from_secs(20),
            min_sleep: MicroSeconds::from_millis(10),
            min_wakeup: MicroSeconds::from_millis(4),
        }
    }
}

/// The decision produced by one call to [`WatermarkController::on_iteration()`].
///
/// Kept free of I/O or logging side effects; the call site is responsible for emitting the
/// `info!`-level change log spec §7 calls for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WatermarkDecision {
    pub watermark: MicroSeconds,
    pub raise_min_latency: Option<MicroSeconds>,
    pub saturated: bool,
}

/// The adaptive watermark state (spec §3's `WatermarkState`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WatermarkController {
    params: WatermarkParams,
    watermark: MicroSeconds,
    upper_clamp: MicroSeconds,
    /// `None` means "no decrease has been verified yet / window not armed".
    dec_not_before: Option<MicroSeconds>,
    min_latency_pinned: bool,
}

impl WatermarkController {
    /// A controller seeded at `initial_watermark`, clamped to `[min_wakeup, upper_clamp]`.
    pub fn new(initial_watermark: MicroSeconds, upper_clamp: MicroSeconds, params: WatermarkParams) -> Self {
        let watermark = initial_watermark.max(params.min_wakeup).min(upper_clamp);
        WatermarkController {
            params,
            watermark,
            upper_clamp,
            dec_not_before: None,
            min_latency_pinned: false,
        }
    }

    #[inline]
    pub fn watermark(&self) -> MicroSeconds {
        self.watermark
    }

    /// Updates the clamp ceiling, e.g. after `update_requested_latency` changes `hwbuf_unused`.
    pub fn set_upper_clamp(&mut self, upper_clamp: MicroSeconds) {
        self.upper_clamp = upper_clamp;
        self.watermark = self.watermark.min(self.upper_clamp).max(self.params.min_wakeup);
    }

    fn clamp(&self, w: MicroSeconds) -> MicroSeconds {
        w.max(self.params.min_wakeup).min(self.upper_clamp)
    }

    /// The state machine transition of spec §4.2, run once per loop iteration.
    pub fn on_iteration(
        &mut self,
        left_to_play: MicroSeconds,
        woken_by: WakeReason,
        underrun: bool,
        first_or_after_rewind: bool,
        now: MicroSeconds,
    ) -> WatermarkDecision {
        if first_or_after_rewind {
            return self.decision(None);
        }

        if underrun || left_to_play < self.params.inc_threshold {
            let raised = self.clamp(self.watermark.doubled().min(self.watermark + self.params.inc_step));
            let pinned_before = self.watermark == self.upper_clamp;
            self.watermark = raised;
            let mut raise_min = None;
            if pinned_before && self.watermark == self.upper_clamp {
                // Watermark is already saturated; ask the caller to raise the latency floor
                // instead, by the same rule.
                raise_min = Some(self.params.inc_step.min(self.watermark));
                if self.min_latency_pinned {
                    return self.decision(raise_min).saturated();
                }
                self.min_latency_pinned = true;
            }
            return self.decision(raise_min);
        }

        if left_to_play > self.params.dec_threshold {
            if woken_by != WakeReason::Timer {
                self.dec_not_before = None;
                return self.decision(None);
            }
            match self.dec_not_before {
                // Unarmed: this merely arms the verify window, it does not lower the watermark.
                None => {
                    self.dec_not_before = Some(now.saturating_add(self.params.verify_after));
                    self.decision(None)
                }
                Some(not_before) if now < not_before => self.decision(None),
                Some(_) => {
                    let lowered = self.clamp(self.watermark.halved().max(
                        self.watermark.saturating_sub(self.params.dec_step),
                    ));
                    self.watermark = lowered;
                    self.dec_not_before = Some(now.saturating_add(self.params.verify_after));
                    self.min_latency_pinned = false;
                    self.decision(None)
                }
            }
        } else {
            self.decision(None)
        }
    }

    fn decision(&self, raise_min_latency: Option<MicroSeconds>) -> WatermarkDecision {
        WatermarkDecision { watermark: self.watermark, raise_min_latency, saturated: false }
    }
}

impl WatermarkDecision {
    fn saturated(mut self) -> Self {
        self.saturated = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> WatermarkController {
        WatermarkController::new(
            MicroSeconds::from_millis(20),
            MicroSeconds::from_millis(1_980),
            WatermarkParams::default(),
        )
    }

    #[test]
    fn underrun_raises_watermark_from_20_to_30ms() {
        // spec §8 scenario 2.
        let mut c = controller();
        let d = c.on_iteration(
            MicroSeconds::ZERO,
            WakeReason::Timer,
            true,
            false,
            MicroSeconds::ZERO,
        );
        assert_eq!(d.watermark, MicroSeconds::from_millis(30));
    }

    #[test]
    fn sustained_health_lowers_watermark_after_verify_window() {
        // spec §8 scenario 3: the first healthy timer wake only arms the verify window; the
        // watermark stays at 20ms until t=20s, at which point it drops to 15ms.
        let mut c = controller();
        let t0 = MicroSeconds::ZERO;
        let armed = c.on_iteration(MicroSeconds::from_millis(150), WakeReason::Timer, false, false, t0);
        assert_eq!(armed.watermark, MicroSeconds::from_millis(20));

        let at_verify = c.on_iteration(
            MicroSeconds::from_millis(150),
            WakeReason::Timer,
            false,
            false,
            t0.saturating_add(MicroSeconds::from_secs(20)),
        );
        assert_eq!(at_verify.watermark, MicroSeconds::from_millis(15));
    }

    #[test]
    fn poll_wakeup_above_threshold_resets_verify_window_without_changing_watermark() {
        // spec §8 scenario 6.
        let mut c = controller();
        let before = c.watermark();
        let d = c.on_iteration(
            MicroSeconds::from_millis(150),
            WakeReason::Poll,
            false,
            false,
            MicroSeconds::ZERO,
        );
        assert_eq!(d.watermark, before);
        assert_eq!(c.dec_not_before, None);
    }

    #[test]
    fn first_or_after_rewind_suppresses_all_adjustment() {
        let mut c = controller();
        let before = c.watermark();
        let d = c.on_iteration(MicroSeconds::ZERO, WakeReason::Timer, true, true, MicroSeconds::ZERO);
        assert_eq!(d.watermark, before);
    }

    #[test]
    fn decrease_is_withheld_before_verify_window_elapses() {
        let mut c = controller();
        let t0 = MicroSeconds::ZERO;
        // First healthy timer wake only arms the window; watermark is unchanged.
        let armed = c.on_iteration(MicroSeconds::from_millis(150), WakeReason::Timer, false, false, t0);
        assert_eq!(armed.watermark, MicroSeconds::from_millis(20));

        let still_within = c.on_iteration(
            MicroSeconds::from_millis(150),
            WakeReason::Timer,
            false,
            false,
            t0.saturating_add(MicroSeconds::from_secs(5)),
        );
        assert_eq!(still_within.watermark, MicroSeconds::from_millis(20));
    }
}
