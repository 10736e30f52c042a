//! Glue between phase transitions and baseline capture.
//!
//! Entering Relax opens a baseline window on the conditioner; entering Act
//! closes it, re-arms it, and republishes `mean + 3·std` when a baseline
//! exists. The threshold therefore changes at most once per Relax→Act
//! boundary and stays unset until the first one.

use tracing::info;

use crate::phase::{Phase, PhaseTracker, PhaseTransition};
use crate::signal::SignalConditioner;

/// What happened during one [`ThresholdController::update`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThresholdUpdate {
    /// Phase change observed this tick, if any.
    pub transition: Option<PhaseTransition>,
    /// New threshold, only when it changed this tick.
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Adaptive,
    Fixed,
}

#[derive(Debug, Clone)]
pub struct ThresholdController {
    mode: Mode,
    tracker: PhaseTracker,
    threshold: Option<f64>,
}

impl ThresholdController {
    /// Threshold calibrated from rest segments; unset until the first one closes.
    pub fn adaptive() -> Self {
        Self {
            mode: Mode::Adaptive,
            tracker: PhaseTracker::default(),
            threshold: None,
        }
    }

    /// Threshold pinned to `value`. Baseline windows are still captured so the
    /// statistics can be logged and reviewed.
    pub fn fixed(value: f64) -> Self {
        Self {
            mode: Mode::Fixed,
            tracker: PhaseTracker::default(),
            threshold: Some(value),
        }
    }

    /// Run once per tick with the phase currently in force.
    pub fn update(&mut self, phase: Phase, conditioner: &mut SignalConditioner) -> ThresholdUpdate {
        let Some(transition) = self.tracker.observe(phase) else {
            return ThresholdUpdate::default();
        };
        let mut update = ThresholdUpdate {
            transition: Some(transition),
            threshold: None,
        };
        match transition.to {
            Phase::Relax => conditioner.mark_as_baseline(),
            Phase::Act => {
                conditioner.mark_as_not_baseline();
                conditioner.reset_baseline();
                if self.mode == Mode::Adaptive {
                    if let Some(baseline) = conditioner.baseline() {
                        let value = baseline.threshold();
                        if self.threshold != Some(value) {
                            info!(
                                threshold = value,
                                mean = baseline.mean,
                                std = baseline.std,
                                "threshold recalibrated"
                            );
                            self.threshold = Some(value);
                            update.threshold = Some(value);
                        }
                    }
                }
            }
            Phase::Prepare | Phase::NotRunning => {}
        }
        update
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn is_adaptive(&self) -> bool {
        self.mode == Mode::Adaptive
    }

    pub fn phase(&self) -> Phase {
        self.tracker.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;

    fn conditioner() -> SignalConditioner {
        SignalConditioner::new(&FilterConfig {
            sampling_frequency: 100.0,
            bandpass_low: 5.0,
            bandpass_high: 30.0,
            bandpass_order: 2,
            mean_kernel_size: Some(4),
            baseline_span_secs: 0.3,
            baseline_exclude_secs: 0.1,
            history_retention_secs: 10.0,
        })
        .unwrap()
    }

    fn feed(c: &mut SignalConditioner, n: usize, amplitude: f64) {
        for i in 0..n {
            c.apply(if i % 2 == 0 { amplitude } else { -amplitude });
        }
    }

    #[test]
    fn unset_until_first_relax_to_act() {
        let mut ctrl = ThresholdController::adaptive();
        let mut c = conditioner();
        ctrl.update(Phase::Prepare, &mut c);
        feed(&mut c, 50, 10.0);
        let up = ctrl.update(Phase::Act, &mut c);
        assert_eq!(up.transition.map(|t| t.to), Some(Phase::Act));
        assert_eq!(up.threshold, None);
        assert_eq!(ctrl.threshold(), None);

        ctrl.update(Phase::Relax, &mut c);
        assert!(c.window().is_open());
        feed(&mut c, 60, 10.0);
        let up = ctrl.update(Phase::Act, &mut c);
        let b = c.baseline().unwrap();
        assert_eq!(up.threshold, Some(b.mean + 3.0 * b.std));
        assert_eq!(ctrl.threshold(), up.threshold);
        assert_eq!(c.window(), Default::default());
    }

    #[test]
    fn stable_within_a_phase() {
        let mut ctrl = ThresholdController::adaptive();
        let mut c = conditioner();
        ctrl.update(Phase::Relax, &mut c);
        feed(&mut c, 60, 10.0);
        ctrl.update(Phase::Act, &mut c);
        let th = ctrl.threshold();
        for _ in 0..5 {
            feed(&mut c, 20, 500.0);
            let up = ctrl.update(Phase::Act, &mut c);
            assert_eq!(up, ThresholdUpdate::default());
            assert_eq!(ctrl.threshold(), th);
        }
    }

    #[test]
    fn fixed_threshold_never_changes() {
        let mut ctrl = ThresholdController::fixed(8.0);
        let mut c = conditioner();
        ctrl.update(Phase::Relax, &mut c);
        feed(&mut c, 60, 10.0);
        let up = ctrl.update(Phase::Act, &mut c);
        assert_eq!(up.threshold, None);
        assert_eq!(ctrl.threshold(), Some(8.0));
        assert!(c.baseline().is_some());
    }
}
