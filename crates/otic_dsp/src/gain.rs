//! Gain Stage - scalar multiply of a sample block

use crate::processor::{AudioProcessor, ProcessContext};

/// Stateless linear gain
///
/// Range checking is the caller's job; the parameter controller clamps
/// before values get here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainStage {
    gain: f32,
}

impl Default for GainStage {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl GainStage {
    pub fn new(gain: f32) -> Self {
        debug_assert!(gain.is_finite() && gain >= 0.0, "gain must be finite and >= 0");
        Self { gain }
    }

    pub fn set_gain(&mut self, gain: f32) {
        debug_assert!(gain.is_finite() && gain >= 0.0, "gain must be finite and >= 0");
        self.gain = gain;
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Multiply every sample of `buffer` by `gain`
    #[inline]
    pub fn apply(buffer: &mut [f32], gain: f32) {
        for sample in buffer.iter_mut() {
            *sample *= gain;
        }
    }
}

impl AudioProcessor for GainStage {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        Self::apply(buffer, self.gain);
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "Gain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unity_gain_passthrough() {
        let ctx = ProcessContext::new(44100.0, 1, 4);
        let mut stage = GainStage::default();
        let mut buffer = vec![0.1, -0.2, 0.3, -0.4];
        stage.process(&mut buffer, &ctx);
        assert_eq!(buffer, vec![0.1, -0.2, 0.3, -0.4]);
    }

    #[test]
    fn test_gain_scales_elementwise() {
        let ctx = ProcessContext::new(44100.0, 1, 3);
        let mut stage = GainStage::new(2.0);
        let mut buffer = vec![0.25, -0.5, 0.0];
        stage.process(&mut buffer, &ctx);
        assert_eq!(buffer, vec![0.5, -1.0, 0.0]);
    }

    #[test]
    fn test_zero_gain_silences() {
        let mut buffer = vec![0.9; 16];
        GainStage::apply(&mut buffer, 0.0);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_set_gain() {
        let mut stage = GainStage::new(1.0);
        stage.set_gain(4.0);
        assert_eq!(stage.gain(), 4.0);
    }
}
