//! Streaming EMG conditioner: bandpass, rectification, trailing mean, and
//! rest-period baseline statistics.

use tracing::debug;

use crate::config::FilterConfig;
use crate::error::ConfigError;

use super::bandpass::Bandpass;
use super::history::History;

/// Threshold sits this many standard deviations above the baseline mean.
pub const STD_MULTIPLIER: f64 = 3.0;

/// Statistics of one captured rest segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Number of samples the statistics were computed from.
    pub samples: usize,
}

impl Baseline {
    /// Mean and population standard deviation; `None` for an empty input.
    pub fn from_samples<I: IntoIterator<Item = f64>>(samples: I) -> Option<Self> {
        let values: Vec<f64> = samples.into_iter().collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        Some(Self {
            mean,
            std: var.sqrt(),
            samples: values.len(),
        })
    }

    /// Activation threshold derived from this baseline.
    pub fn threshold(&self) -> f64 {
        self.mean + STD_MULTIPLIER * self.std
    }
}

/// Half-open `[start, end)` range over the output history marking a rest segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaselineWindow {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl BaselineWindow {
    pub fn is_open(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// Turns raw samples into smoothed, rectified band-limited amplitude.
///
/// Retention: each history keeps `history_retention_secs` of samples, but never
/// less than the mean kernel plus the baseline span and exclusion, so a
/// baseline can always be computed from a window that has just closed.
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    bandpass: Bandpass,
    sampling_frequency: f64,
    kernel_size: usize,
    baseline_span: usize,
    baseline_exclude: usize,
    input: History,
    bandpassed: History,
    output: History,
    window: BaselineWindow,
    baseline: Option<Baseline>,
}

impl SignalConditioner {
    pub fn new(cfg: &FilterConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let bandpass = Bandpass::butterworth(
            cfg.bandpass_order,
            cfg.bandpass_low,
            cfg.effective_high(),
            cfg.sampling_frequency,
        )?;
        let kernel_size = cfg.kernel_size();
        let baseline_span = cfg.samples_for(cfg.baseline_span_secs);
        let baseline_exclude = cfg.samples_for(cfg.baseline_exclude_secs);
        let retention = cfg
            .samples_for(cfg.history_retention_secs)
            .max(kernel_size)
            .max(baseline_span + baseline_exclude);
        debug!(
            fs = cfg.sampling_frequency,
            low = cfg.bandpass_low,
            high = cfg.effective_high(),
            order = cfg.bandpass_order,
            kernel_size,
            retention,
            "signal conditioner configured"
        );
        Ok(Self {
            bandpass,
            sampling_frequency: cfg.sampling_frequency,
            kernel_size,
            baseline_span,
            baseline_exclude,
            input: History::with_capacity(retention),
            bandpassed: History::with_capacity(retention),
            output: History::with_capacity(retention),
            window: BaselineWindow::default(),
            baseline: None,
        })
    }

    /// Filter one raw sample and return the smoothed amplitude.
    pub fn apply(&mut self, raw: f64) -> f64 {
        self.input.push(raw);
        let rectified = self.bandpass.process(raw).abs();
        self.bandpassed.push(rectified);

        let n = self.kernel_size.min(self.bandpassed.retained());
        let smoothed = self.bandpassed.tail(n).sum::<f64>() / n as f64;
        self.output.push(smoothed);
        smoothed
    }

    /// Open a baseline window at the current output position. No-op while open.
    pub fn mark_as_baseline(&mut self) {
        if self.window.start.is_none() {
            self.window.start = Some(self.output.len());
        }
    }

    /// Close the open window and recompute the baseline from its trailing part.
    ///
    /// The newest `baseline_exclude_secs` are dropped and the preceding
    /// `baseline_span_secs` are used. When that leaves nothing, the previous
    /// baseline is kept.
    pub fn mark_as_not_baseline(&mut self) {
        let Some(start) = self.window.start else {
            return;
        };
        if self.window.end.is_some() {
            return;
        }
        let end = self.output.len();
        self.window.end = Some(end);

        let (sub_start, sub_end) = self.baseline_range(start, end);
        if sub_end <= sub_start {
            debug!(start, end, "baseline window too short, keeping previous baseline");
            return;
        }
        if let Some(baseline) = Baseline::from_samples(self.output.range(sub_start, sub_end)) {
            debug!(
                mean = baseline.mean,
                std = baseline.std,
                samples = baseline.samples,
                "baseline updated"
            );
            self.baseline = Some(baseline);
        }
    }

    /// Clear the window markers so the next rest segment can be captured.
    /// The last computed baseline is kept.
    pub fn reset_baseline(&mut self) {
        self.window = BaselineWindow::default();
    }

    /// Absolute output range the baseline of window `[start, end)` is taken from.
    pub fn baseline_range(&self, start: usize, end: usize) -> (usize, usize) {
        let sub_end = end.saturating_sub(self.baseline_exclude);
        let sub_start = sub_end
            .saturating_sub(self.baseline_span)
            .max(start)
            .max(self.output.first_index());
        (sub_start, sub_end)
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    pub fn threshold(&self) -> Option<f64> {
        self.baseline.map(|b| b.threshold())
    }

    pub fn window(&self) -> BaselineWindow {
        self.window
    }

    pub fn last_output(&self) -> Option<f64> {
        self.output.last()
    }

    pub fn input(&self) -> &History {
        &self.input
    }

    pub fn bandpassed(&self) -> &History {
        &self.bandpassed
    }

    pub fn output(&self) -> &History {
        &self.output
    }

    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100 Hz stream, short windows so tests stay small:
    /// baseline span 0.3 s = 30 samples, exclusion 0.1 s = 10 samples.
    fn small() -> SignalConditioner {
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

    fn feed(c: &mut SignalConditioner, n: usize) {
        for i in 0..n {
            c.apply(((i * 7919) % 97) as f64 - 48.0);
        }
    }

    #[test]
    fn output_is_mean_of_trailing_bandpassed_values() {
        let mut c = small();
        feed(&mut c, 3);
        let bp: Vec<f64> = c.bandpassed().tail(3).collect();
        let expected = bp.iter().sum::<f64>() / 3.0;
        assert!((c.last_output().unwrap() - expected).abs() < 1e-12);

        feed(&mut c, 10);
        let bp: Vec<f64> = c.bandpassed().tail(4).collect();
        let expected = bp.iter().sum::<f64>() / 4.0;
        assert!((c.last_output().unwrap() - expected).abs() < 1e-12);
        assert!(c.bandpassed().iter().all(|(_, v)| v >= 0.0));
    }

    #[test]
    fn opening_twice_keeps_start() {
        let mut c = small();
        feed(&mut c, 5);
        c.mark_as_baseline();
        feed(&mut c, 5);
        c.mark_as_baseline();
        assert_eq!(c.window().start, Some(5));
        assert!(c.window().is_open());
    }

    #[test]
    fn closing_without_open_window_is_noop() {
        let mut c = small();
        feed(&mut c, 50);
        c.mark_as_not_baseline();
        assert_eq!(c.window(), BaselineWindow::default());
        assert!(c.baseline().is_none());
    }

    #[test]
    fn baseline_uses_trailing_subwindow_only() {
        let mut c = small();
        feed(&mut c, 20);
        c.mark_as_baseline();
        feed(&mut c, 60);
        c.mark_as_not_baseline();
        // window [20, 80): exclusion drops 70..80, span keeps 40..70
        assert_eq!(c.window().end, Some(80));
        assert_eq!(c.baseline_range(20, 80), (40, 70));

        let sub: Vec<f64> = c.output().range(40, 70).collect();
        assert_eq!(sub.len(), 30);
        let mean = sub.iter().sum::<f64>() / 30.0;
        let std = (sub.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 30.0).sqrt();
        let b = c.baseline().unwrap();
        assert!((b.mean - mean).abs() < 1e-9);
        assert!((b.std - std).abs() < 1e-9);
        assert_eq!(b.samples, 30);
        assert!((c.threshold().unwrap() - (mean + 3.0 * std)).abs() < 1e-9);
    }

    #[test]
    fn second_close_is_noop() {
        let mut c = small();
        c.mark_as_baseline();
        feed(&mut c, 60);
        c.mark_as_not_baseline();
        let first = c.baseline();
        feed(&mut c, 60);
        c.mark_as_not_baseline();
        assert_eq!(c.baseline(), first);
        assert_eq!(c.window().end, Some(60));
    }

    #[test]
    fn short_window_keeps_previous_baseline() {
        let mut c = small();
        c.mark_as_baseline();
        feed(&mut c, 60);
        c.mark_as_not_baseline();
        let first = c.baseline().unwrap();
        c.reset_baseline();
        assert_eq!(c.window(), BaselineWindow::default());
        assert_eq!(c.baseline(), Some(first));

        // 5 samples is shorter than the 10-sample exclusion.
        c.mark_as_baseline();
        feed(&mut c, 5);
        c.mark_as_not_baseline();
        assert_eq!(c.baseline(), Some(first));
        assert!(first.mean.is_finite() && first.std.is_finite());
    }

    #[test]
    fn window_shorter_than_span_uses_what_it_has() {
        let mut c = small();
        feed(&mut c, 100);
        c.mark_as_baseline();
        feed(&mut c, 25);
        c.mark_as_not_baseline();
        // [100, 125) minus exclusion → [100, 115)
        assert_eq!(c.baseline().unwrap().samples, 15);
    }

    #[test]
    fn population_std_of_constant_is_zero() {
        let b = Baseline::from_samples([2.0, 2.0, 2.0]).unwrap();
        assert_eq!(b.mean, 2.0);
        assert_eq!(b.std, 0.0);
        assert_eq!(b.threshold(), 2.0);
        assert!(Baseline::from_samples(std::iter::empty()).is_none());
        let b = Baseline::from_samples([1.0, 3.0]).unwrap();
        assert_eq!(b.std, 1.0);
        assert_eq!(b.threshold(), 5.0);
    }
}
