//! Peaking EQ Coefficient Engine
//!
//! Computes second-order IIR coefficients from musical parameters using the
//! RBJ (Robert Bristow-Johnson) Audio EQ Cookbook peaking formulas.
//!
//! All math runs in `f64` regardless of the block sample format. Narrowing
//! the intermediate terms to `f32` quantizes the poles badly for low centre
//! frequencies at high sample rates.

use std::f64::consts::PI;

use biquad::Coefficients;

use crate::error::DspError;

/// Normalized biquad coefficients (a0 == 1)
///
/// Immutable value record handed to a [`FilterStage`](crate::FilterStage).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoefficients {
    /// Pass-through section: y[n] = x[n]
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Peaking EQ coefficients
    ///
    /// # Panics
    /// Panics if `sample_rate_hz <= 0`, `q <= 0`, or `freq_hz` is not strictly
    /// inside (0, Nyquist). These are configuration invariants fixed at
    /// startup, so a violation is a programming error.
    pub fn peaking(freq_hz: f64, q: f64, gain_db: f64, sample_rate_hz: f64) -> Self {
        match Self::try_peaking(freq_hz, q, gain_db, sample_rate_hz) {
            Ok(coefficients) => coefficients,
            Err(err) => panic!("invalid peaking filter parameters: {err}"),
        }
    }

    /// Checked variant of [`peaking`](Self::peaking), for validating
    /// configuration before the audio path starts.
    pub fn try_peaking(
        freq_hz: f64,
        q: f64,
        gain_db: f64,
        sample_rate_hz: f64,
    ) -> Result<Self, DspError> {
        // Negated comparisons so NaN is rejected too
        if !(sample_rate_hz > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate_hz));
        }
        if !(q > 0.0) {
            return Err(DspError::InvalidQ(q));
        }
        if !(freq_hz > 0.0 && freq_hz < sample_rate_hz / 2.0) {
            return Err(DspError::InvalidFrequency {
                frequency: freq_hz,
                sample_rate: sample_rate_hz,
            });
        }

        let a = 10.0_f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a;
        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a;

        Ok(Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        })
    }

    /// Magnitude of the frequency response |H(e^jw)| at `freq_hz`
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate_hz: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / sample_rate_hz;
        let (sin1, cos1) = w.sin_cos();
        let (sin2, cos2) = (2.0 * w).sin_cos();

        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

impl From<BiquadCoefficients> for Coefficients<f64> {
    fn from(c: BiquadCoefficients) -> Self {
        Coefficients {
            a1: c.a1,
            a2: c.a2,
            b0: c.b0,
            b1: c.b1,
            b2: c.b2,
        }
    }
}
