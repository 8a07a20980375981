//! Calibration Test-Tone Generator
//!
//! Sine oscillator with a bounded phase accumulator. Frequency and level
//! changes take effect at the next block; the phase carries over so only
//! the frequency itself changes (no click suppression).

use std::f64::consts::TAU;

/// Levels at or below this are hard silence, not merely a tiny amplitude
pub const SILENCE_FLOOR_DB: f32 = -90.0;

/// Convert a level in dB to a linear amplitude in [0, 1]
///
/// Anything at or below [`SILENCE_FLOOR_DB`] (or NaN) maps to exactly 0.0.
pub fn db_to_amplitude(db: f32) -> f32 {
    if !(db > SILENCE_FLOOR_DB) {
        return 0.0;
    }
    10.0_f32.powf(db / 20.0).clamp(0.0, 1.0)
}

/// Sine generator writing into interleaved blocks
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    frequency: f32,
    amplitude: f32,
    phase: f64,
    sample_rate: f64,
}

impl ToneGenerator {
    pub const DEFAULT_FREQUENCY: f32 = 1000.0;

    /// New generator at 1 kHz, silent
    pub fn new(sample_rate: f64) -> Self {
        debug_assert!(sample_rate > 0.0);
        Self {
            frequency: Self::DEFAULT_FREQUENCY,
            amplitude: 0.0,
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Linear amplitude, clamped to [0, 1]
    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = if amplitude.is_nan() {
            0.0
        } else {
            amplitude.clamp(0.0, 1.0)
        };
    }

    pub fn set_level_db(&mut self, db: f32) {
        self.amplitude = db_to_amplitude(db);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Current phase in radians, always in [0, 2π)
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Fill an interleaved buffer; every channel of a frame gets the same sample
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32], channels: usize) {
        let increment = TAU * f64::from(self.frequency) / self.sample_rate;
        let amplitude = f64::from(self.amplitude);

        for frame in buffer.chunks_mut(channels.max(1)) {
            let sample = (amplitude * self.phase.sin()) as f32;
            frame.fill(sample);
            self.phase = (self.phase + increment).rem_euclid(TAU);
        }
    }

    /// Restart from zero phase
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
