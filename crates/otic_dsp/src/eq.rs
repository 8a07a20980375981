//! 3-Band Hearing Equalizer
//!
//! Three fixed peaking bands (500 Hz, 2 kHz, 4 kHz) run as a cascade of
//! [`FilterStage`]s. The order is fixed so results are reproducible bit for
//! bit; the frequency response would be the same in any order.

use crate::coefficients::BiquadCoefficients;
use crate::filter::FilterStage;
use crate::processor::{AudioProcessor, ProcessContext};

/// Number of peaking bands in the cascade
pub const NUM_BANDS: usize = 3;

/// The three peaking bands, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqBand {
    Low500,
    Mid2000,
    High4000,
}

/// Bands in processing order
pub const EQ_BANDS: [EqBand; NUM_BANDS] = [EqBand::Low500, EqBand::Mid2000, EqBand::High4000];

impl EqBand {
    /// Quality factor shared by all bands
    pub const Q: f64 = 1.0;

    /// Centre frequency in Hz
    pub fn frequency(self) -> f64 {
        match self {
            EqBand::Low500 => 500.0,
            EqBand::Mid2000 => 2000.0,
            EqBand::High4000 => 4000.0,
        }
    }

    pub fn q(self) -> f64 {
        Self::Q
    }

    /// Position in the cascade
    pub fn index(self) -> usize {
        match self {
            EqBand::Low500 => 0,
            EqBand::Mid2000 => 1,
            EqBand::High4000 => 2,
        }
    }

    /// Short label used by the control protocol (`EQ500`, ...)
    pub fn label(self) -> &'static str {
        match self {
            EqBand::Low500 => "EQ500",
            EqBand::Mid2000 => "EQ2000",
            EqBand::High4000 => "EQ4000",
        }
    }

    /// Peaking coefficients for this band at `gain_db`
    pub fn coefficients(self, gain_db: f32, sample_rate: f64) -> BiquadCoefficients {
        BiquadCoefficients::peaking(self.frequency(), self.q(), f64::from(gain_db), sample_rate)
    }
}

/// The filter cascade: band 1 -> band 2 -> band 3
pub struct Equalizer {
    stages: [FilterStage; NUM_BANDS],
}

impl Equalizer {
    /// Flat cascade (identity coefficients) for `channels` channels
    pub fn new(channels: usize) -> Self {
        Self {
            stages: core::array::from_fn(|_| {
                FilterStage::new(BiquadCoefficients::IDENTITY, channels)
            }),
        }
    }

    /// Swap the coefficient set of one band; history is preserved
    pub fn set_band_coefficients(&mut self, band: EqBand, coefficients: BiquadCoefficients) {
        self.stages[band.index()].set_coefficients(coefficients);
    }

    /// Swap all three bands at once
    pub fn set_coefficients(&mut self, coefficients: &[BiquadCoefficients; NUM_BANDS]) {
        for (stage, c) in self.stages.iter_mut().zip(coefficients.iter()) {
            stage.set_coefficients(*c);
        }
    }

    pub fn band_coefficients(&self, band: EqBand) -> BiquadCoefficients {
        self.stages[band.index()].coefficients()
    }

    /// Run the block through all three stages in order
    #[inline]
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        for stage in &mut self.stages {
            stage.process_interleaved(buffer);
        }
    }

    /// Reset filter state (clear delay lines)
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}

impl AudioProcessor for Equalizer {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        self.process_interleaved(buffer);
    }

    fn reset(&mut self) {
        Equalizer::reset(self);
    }

    fn name(&self) -> &'static str {
        "3-Band Equalizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 44100.0;

    fn sine_block(freq: f64, amplitude: f32, start: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = (start + i) as f64 / FS;
                amplitude * (2.0 * std::f64::consts::PI * freq * t).sin() as f32
            })
            .collect()
    }

    #[test]
    fn test_band_frequencies() {
        let freqs: Vec<f64> = EQ_BANDS.iter().map(|b| b.frequency()).collect();
        assert_eq!(freqs, vec![500.0, 2000.0, 4000.0]);
        for (i, band) in EQ_BANDS.iter().enumerate() {
            assert_eq!(band.index(), i);
            assert_eq!(band.q(), 1.0);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(EqBand::Low500.label(), "EQ500");
        assert_eq!(EqBand::Mid2000.label(), "EQ2000");
        assert_eq!(EqBand::High4000.label(), "EQ4000");
    }

    #[test]
    fn test_flat_cascade_is_transparent() {
        let mut eq = Equalizer::new(1);
        let coefficients = EQ_BANDS.map(|b| b.coefficients(0.0, FS));
        eq.set_coefficients(&coefficients);

        let mut max_err = 0.0_f32;
        for block in 0..20 {
            let input = sine_block(1000.0, 0.5, block * 128, 128);
            let mut buffer = input.clone();
            eq.process_interleaved(&mut buffer);
            for (x, y) in input.iter().zip(buffer.iter()) {
                max_err = max_err.max((x - y).abs());
            }
        }
        assert!(max_err < 1e-5, "flat cascade changed the signal by {max_err}");
    }

    #[test]
    fn test_boost_at_500hz() {
        let mut eq = Equalizer::new(1);
        eq.set_band_coefficients(EqBand::Low500, EqBand::Low500.coefficients(12.0, FS));
        assert_eq!(eq.band_coefficients(EqBand::Mid2000), BiquadCoefficients::IDENTITY);

        let amplitude = 0.1;
        let mut peak = 0.0_f32;
        for block in 0..60 {
            let mut buffer = sine_block(500.0, amplitude, block * 128, 128);
            eq.process_interleaved(&mut buffer);
            // Skip the settling transient
            if block >= 40 {
                peak = buffer.iter().fold(peak, |m, s| m.max(s.abs()));
            }
        }

        let expected = amplitude * 10.0_f32.powf(12.0 / 20.0);
        assert!((peak - expected).abs() / expected < 0.02, "peak {peak}, expected {expected}");
    }

    #[test]
    fn test_cut_at_4khz() {
        let mut eq = Equalizer::new(1);
        eq.set_band_coefficients(EqBand::High4000, EqBand::High4000.coefficients(-20.0, FS));

        let mut peak = 0.0_f32;
        for block in 0..60 {
            let mut buffer = sine_block(4000.0, 0.5, block * 128, 128);
            eq.process_interleaved(&mut buffer);
            if block >= 40 {
                peak = buffer.iter().fold(peak, |m, s| m.max(s.abs()));
            }
        }
        assert!((peak - 0.05).abs() < 0.002, "peak {peak}");
    }

    #[test]
    fn test_reset_doesnt_panic() {
        let mut eq = Equalizer::new(2);
        let mut buffer = vec![0.5; 256];
        eq.process_interleaved(&mut buffer);
        eq.reset();
        let mut buffer = vec![0.0; 8];
        eq.process_interleaved(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }
}
