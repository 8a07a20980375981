//! Biquad Filter Stage
//!
//! One second-order IIR section with one delay line per audio channel.
//! Direct Form I: y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]

use biquad::{Biquad, DirectForm1};

use crate::coefficients::BiquadCoefficients;
use crate::processor::{AudioProcessor, ProcessContext};

/// A single peaking section applied in place to interleaved blocks
pub struct FilterStage {
    coefficients: BiquadCoefficients,
    // One history per channel; history is f64 to match the coefficients
    channels: Vec<DirectForm1<f64>>,
}

impl FilterStage {
    /// Create a stage for `channels` interleaved channels
    ///
    /// Allocates; call during setup, not in the audio callback.
    pub fn new(coefficients: BiquadCoefficients, channels: usize) -> Self {
        let channels = (0..channels.max(1))
            .map(|_| DirectForm1::<f64>::new(coefficients.into()))
            .collect();

        Self {
            coefficients,
            channels,
        }
    }

    /// Replace the active coefficient set
    ///
    /// Delay-line history is kept so a mid-stream change does not click.
    /// Takes effect from the next processed sample, which in the graph is
    /// always the start of a block.
    pub fn set_coefficients(&mut self, coefficients: BiquadCoefficients) {
        if coefficients == self.coefficients {
            return;
        }
        self.coefficients = coefficients;
        for filter in &mut self.channels {
            filter.update_coefficients(coefficients.into());
        }
    }

    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coefficients
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Process an interleaved buffer in-place
    ///
    /// A trailing partial frame is left untouched.
    #[inline]
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        let channels = self.channels.len();
        for frame in buffer.chunks_exact_mut(channels) {
            for (sample, filter) in frame.iter_mut().zip(self.channels.iter_mut()) {
                *sample = filter.run(f64::from(*sample)) as f32;
            }
        }
    }

    /// Clear all delay lines
    pub fn reset(&mut self) {
        for filter in &mut self.channels {
            filter.reset_state();
        }
    }
}

impl AudioProcessor for FilterStage {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        self.process_interleaved(buffer);
    }

    fn reset(&mut self) {
        FilterStage::reset(self);
    }

    fn name(&self) -> &'static str {
        "Peaking Filter"
    }
}
