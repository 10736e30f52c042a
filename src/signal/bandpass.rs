//! Causal Butterworth bandpass as a cascade of second-order sections.
//!
//! Design follows the classic analog route: Butterworth lowpass prototype,
//! lowpass-to-bandpass transform around the pre-warped band edges, bilinear
//! transform, then unit gain at the band centre. An order-`n` prototype gives
//! `n` biquads with zeros at `z = ±1`.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::error::ConfigError;

/// Imaginary parts below this are treated as real poles when pairing sections.
const REAL_POLE_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b: [f64; 3],
    /// `a[0]` is always 1.
    a: [f64; 3],
}

impl Biquad {
    fn response(&self, z_inv: Complex64) -> Complex64 {
        let z_inv2 = z_inv * z_inv;
        let num = self.b[0] + z_inv * self.b[1] + z_inv2 * self.b[2];
        let den = self.a[0] + z_inv * self.a[1] + z_inv2 * self.a[2];
        num / den
    }
}

/// Transposed direct form II delay line of one section.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Delay {
    z1: f64,
    z2: f64,
}

/// Streaming bandpass filter. Coefficients are fixed at construction; the
/// delay lines carry over between calls to [`Bandpass::process`].
#[derive(Debug, Clone)]
pub struct Bandpass {
    sections: Vec<Biquad>,
    state: Vec<Delay>,
}

impl Bandpass {
    /// Design an order-`order` Butterworth bandpass for `[low, high]` Hz at `fs` Hz.
    pub fn butterworth(order: usize, low: f64, high: f64, fs: f64) -> Result<Self, ConfigError> {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(ConfigError::SamplingFrequency(fs));
        }
        if !(low > 0.0 && low < high && high < fs / 2.0) {
            return Err(ConfigError::Bandpass { low, high, fs });
        }
        if order == 0 {
            return Err(ConfigError::ZeroOrder);
        }

        let fs2 = 2.0 * fs;
        let w_low = fs2 * (PI * low / fs).tan();
        let w_high = fs2 * (PI * high / fs).tan();
        let bandwidth = w_high - w_low;
        let w0_sq = w_low * w_high;

        let mut poles = Vec::with_capacity(2 * order);
        for k in 0..order {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let half = Complex64::from_polar(1.0, theta) * (bandwidth / 2.0);
            let disc = (half * half - w0_sq).sqrt();
            for s in [half + disc, half - disc] {
                poles.push((fs2 + s) / (fs2 - s));
            }
        }

        let mut sections = Vec::with_capacity(order);
        let mut real_poles = Vec::new();
        for p in &poles {
            if p.im > REAL_POLE_EPS {
                sections.push(Biquad {
                    b: [1.0, 0.0, -1.0],
                    a: [1.0, -2.0 * p.re, p.norm_sqr()],
                });
            } else if p.im.abs() <= REAL_POLE_EPS {
                real_poles.push(p.re);
            }
        }
        for pair in real_poles.chunks(2) {
            let a = match *pair {
                [p0, p1] => [1.0, -(p0 + p1), p0 * p1],
                [p0] => [1.0, -p0, 0.0],
                _ => continue,
            };
            sections.push(Biquad {
                b: [1.0, 0.0, -1.0],
                a,
            });
        }

        let mut filter = Self {
            state: vec![Delay::default(); sections.len()],
            sections,
        };

        let center = 2.0 * (w0_sq.sqrt() / fs2).atan();
        let gain = filter.response_at_omega(center);
        if gain > 0.0 && gain.is_finite() {
            let per_section = gain.powf(-1.0 / filter.sections.len() as f64);
            for s in &mut filter.sections {
                for b in &mut s.b {
                    *b *= per_section;
                }
            }
        }
        Ok(filter)
    }

    /// Filter one sample.
    pub fn process(&mut self, x: f64) -> f64 {
        let mut v = x;
        for (s, d) in self.sections.iter().zip(self.state.iter_mut()) {
            let y = s.b[0] * v + d.z1;
            d.z1 = s.b[1] * v - s.a[1] * y + d.z2;
            d.z2 = s.b[2] * v - s.a[2] * y;
            v = y;
        }
        v
    }

    /// Clear the delay lines.
    pub fn reset(&mut self) {
        self.state.iter_mut().for_each(|d| *d = Delay::default());
    }

    /// Number of second-order sections.
    pub fn sections(&self) -> usize {
        self.sections.len()
    }

    /// Magnitude response at `freq` Hz for sampling rate `fs`.
    pub fn magnitude_at(&self, freq: f64, fs: f64) -> f64 {
        self.response_at_omega(2.0 * PI * freq / fs)
    }

    fn response_at_omega(&self, omega: f64) -> f64 {
        let z_inv = Complex64::from_polar(1.0, -omega);
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z_inv))
            .norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 4000.0;

    fn emg_band() -> Bandpass {
        Bandpass::butterworth(4, 20.0, 200.0, FS).unwrap()
    }

    #[test]
    fn order_gives_one_section_per_prototype_pole() {
        assert_eq!(emg_band().sections(), 4);
        assert_eq!(Bandpass::butterworth(3, 20.0, 200.0, FS).unwrap().sections(), 3);
    }

    #[test]
    fn unit_gain_at_center_and_half_power_at_edges() {
        let bp = emg_band();
        let center = 2.0 * FS / (2.0 * PI)
            * ((2.0 * PI * 20.0 / (2.0 * FS)).tan() * (2.0 * PI * 200.0 / (2.0 * FS)).tan())
                .sqrt()
                .atan();
        assert!((bp.magnitude_at(center, FS) - 1.0).abs() < 1e-6);
        let edge = std::f64::consts::FRAC_1_SQRT_2;
        assert!((bp.magnitude_at(20.0, FS) - edge).abs() < 1e-3);
        assert!((bp.magnitude_at(200.0, FS) - edge).abs() < 1e-3);
    }

    #[test]
    fn rejects_out_of_band() {
        let bp = emg_band();
        assert!(bp.magnitude_at(1.0, FS) < 1e-3);
        assert!(bp.magnitude_at(1000.0, FS) < 1e-3);
        assert!(bp.magnitude_at(0.0, FS) < 1e-9);
    }

    #[test]
    fn constant_input_decays_to_zero() {
        let mut bp = emg_band();
        let mut last = 0.0;
        for _ in 0..40_000 {
            last = bp.process(1000.0);
            assert!(last.is_finite());
        }
        assert!(last.abs() < 1e-3, "DC should be blocked, got {last}");
    }

    #[test]
    fn reset_restores_initial_response() {
        let mut bp = emg_band();
        let first: Vec<f64> = (0..10).map(|i| bp.process(i as f64)).collect();
        bp.reset();
        let again: Vec<f64> = (0..10).map(|i| bp.process(i as f64)).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn invalid_designs_are_config_errors() {
        assert!(matches!(
            Bandpass::butterworth(4, 200.0, 20.0, FS),
            Err(ConfigError::Bandpass { .. })
        ));
        assert!(matches!(
            Bandpass::butterworth(4, 20.0, 2000.0, FS),
            Err(ConfigError::Bandpass { .. })
        ));
        assert!(matches!(
            Bandpass::butterworth(0, 20.0, 200.0, FS),
            Err(ConfigError::ZeroOrder)
        ));
    }
}
