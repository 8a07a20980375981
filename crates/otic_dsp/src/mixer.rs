//! N-input weighted summer
//!
//! output[n] = sum(gain_i * input_i[n]). No clipping or limiting here;
//! saturation policy belongs to the output transport.

use crate::error::DspError;

/// Fixed-width mixer with a per-input gain in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Mixer<const N: usize> {
    gains: [f32; N],
}

impl<const N: usize> Default for Mixer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Mixer<N> {
    /// All inputs start at unity gain
    pub fn new() -> Self {
        Self { gains: [1.0; N] }
    }

    /// Set the gain of one input (clamped to [0, 1])
    pub fn set_input_gain(&mut self, index: usize, gain: f32) -> Result<(), DspError> {
        let slot = self
            .gains
            .get_mut(index)
            .ok_or(DspError::InvalidInputIndex { index, inputs: N })?;
        *slot = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
        Ok(())
    }

    /// Set every input gain at once (each clamped to [0, 1])
    pub fn set_gains(&mut self, gains: [f32; N]) {
        for (slot, gain) in self.gains.iter_mut().zip(gains) {
            *slot = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
        }
    }

    pub fn input_gain(&self, index: usize) -> Option<f32> {
        self.gains.get(index).copied()
    }

    pub fn gains(&self) -> [f32; N] {
        self.gains
    }

    /// Sum the inputs into `output`
    ///
    /// Every input must have the same length as `output`. Inputs at zero
    /// gain are skipped entirely.
    #[inline]
    pub fn process(&self, inputs: [&[f32]; N], output: &mut [f32]) -> Result<(), DspError> {
        if let Some(bad) = inputs.iter().find(|input| input.len() != output.len()) {
            return Err(DspError::BufferSizeMismatch {
                expected: output.len(),
                got: bad.len(),
            });
        }

        output.fill(0.0);
        for (input, &gain) in inputs.iter().zip(self.gains.iter()) {
            if gain == 0.0 {
                continue;
            }
            for (out, &sample) in output.iter_mut().zip(input.iter()) {
                *out += gain * sample;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unity() {
        let mixer = Mixer::<4>::new();
        assert_eq!(mixer.gains(), [1.0; 4]);
    }

    #[test]
    fn test_weighted_sum() {
        let mut mixer = Mixer::<2>::new();
        mixer.set_input_gain(0, 0.5).unwrap();
        mixer.set_input_gain(1, 0.25).unwrap();

        let a = [1.0, 2.0, -1.0];
        let b = [4.0, 0.0, 4.0];
        let mut out = [9.9; 3];
        mixer.process([&a[..], &b[..]], &mut out).unwrap();

        assert_eq!(out, [1.5, 1.0, 0.5]);
    }

    #[test]
    fn test_hard_routing_selects_one_input() {
        let mut mixer = Mixer::<2>::new();
        mixer.set_input_gain(0, 0.0).unwrap();
        mixer.set_input_gain(1, 1.0).unwrap();

        let normal = [0.3, 0.3];
        let tone = [0.1, -0.1];
        let mut out = [0.0; 2];
        mixer.process([&normal[..], &tone[..]], &mut out).unwrap();
        assert_eq!(out, tone);
    }

    #[test]
    fn test_no_clipping() {
        let mixer = Mixer::<2>::new();
        let a = [0.9];
        let b = [0.9];
        let mut out = [0.0];
        mixer.process([&a[..], &b[..]], &mut out).unwrap();
        assert!((out[0] - 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_gain_clamped() {
        let mut mixer = Mixer::<2>::new();
        mixer.set_input_gain(0, 3.0).unwrap();
        mixer.set_input_gain(1, -1.0).unwrap();
        assert_eq!(mixer.input_gain(0), Some(1.0));
        assert_eq!(mixer.input_gain(1), Some(0.0));

        mixer.set_input_gain(0, f32::NAN).unwrap();
        assert_eq!(mixer.input_gain(0), Some(0.0));
    }

    #[test]
    fn test_set_gains() {
        let mut mixer = Mixer::<2>::new();
        mixer.set_gains([0.0, 2.0]);
        assert_eq!(mixer.gains(), [0.0, 1.0]);
    }

    #[test]
    fn test_invalid_index() {
        let mut mixer = Mixer::<2>::new();
        assert_eq!(
            mixer.set_input_gain(2, 1.0),
            Err(DspError::InvalidInputIndex {
                index: 2,
                inputs: 2,
            })
        );
        assert_eq!(mixer.input_gain(7), None);
    }

    #[test]
    fn test_length_mismatch() {
        let mixer = Mixer::<2>::new();
        let a = [0.0; 4];
        let b = [0.0; 3];
        let mut out = [0.0; 4];
        assert!(matches!(
            mixer.process([&a[..], &b[..]], &mut out),
            Err(DspError::BufferSizeMismatch {
                expected: 4,
                got: 3,
            })
        ));
    }
}
