//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("Quality factor must be positive, got {0}")]
    InvalidQ(f64),

    #[error(
        "Frequency {frequency}Hz must lie strictly between 0 and Nyquist \
         at sample rate {sample_rate}Hz"
    )]
    InvalidFrequency { frequency: f64, sample_rate: f64 },

    #[error("Invalid mixer input index: {index} (mixer has {inputs} inputs)")]
    InvalidInputIndex { index: usize, inputs: usize },

    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },
}
