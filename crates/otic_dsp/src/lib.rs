//! Otic DSP - Digital Signal Processing Module
//!
//! This crate provides the numeric core of the Otic hearing equalizer:
//! - RBJ peaking coefficient engine (double precision)
//! - Biquad filter stages with per-channel history
//! - 3-band peaking cascade (500 Hz / 2 kHz / 4 kHz)
//! - Gain stage and N-input mixer
//! - Calibration sine test tone
//!
//! # Architecture
//!
//! Nothing in this crate allocates or locks inside a `process` call.
//! Coefficients are plain values; swapping them between blocks never
//! touches filter history. Threading and parameter publication live in
//! `otic_core`.

mod coefficients;
mod eq;
mod error;
mod filter;
mod gain;
mod mixer;
mod presets;
mod processor;
mod tone;

pub use coefficients::BiquadCoefficients;
pub use eq::{EqBand, Equalizer, EQ_BANDS, NUM_BANDS};
pub use error::DspError;
pub use filter::FilterStage;
pub use gain::GainStage;
pub use mixer::Mixer;
pub use presets::{find_preset, Preset, PRESETS};
pub use processor::{AudioProcessor, ProcessContext};
pub use tone::{db_to_amplitude, ToneGenerator, SILENCE_FLOOR_DB};
