//! Otic Core - Audio Engine
//!
//! This crate turns the DSP building blocks of `otic_dsp` into a running
//! hearing pipeline:
//! - Parameter Controller and the lock-free handoff to the audio path
//! - Fixed Signal Graph (gain, three peaking bands, test-tone mixer)
//! - Audio transport seam and the engine thread that drives the graph
//! - Line-based control protocol
//! - Audiogram measurement and profile storage
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Control Thread                         │
//! │  protocol line ──▶ Command ──▶ ParameterController          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ handoff (try_lock at block boundary)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │   Capture ──rtrb──▶ SignalGraph ──rtrb──▶ Playback          │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod audiogram;
mod config;
mod controller;
mod engine;
mod error;
mod graph;
mod handoff;
mod message;
mod params;
mod settings;
mod transport;

pub use audiogram::{
    band_frequencies, compute_eq, Audiogram, AudiogramEq, Staircase, AUDIOGRAM_FREQUENCIES,
};
pub use config::{EngineConfig, StreamConfig};
pub use controller::ParameterController;
pub use engine::AudioEngine;
pub use error::{EngineError, EngineResult};
pub use graph::{build_pipeline, SignalGraph, NORMAL_INPUT, TEST_INPUT};
pub use handoff::{ParamReader, ParamWriter};
pub use message::{Command, Event, ProtocolError, Response};
pub use params::{EqParams, PipelineParams, RouteGains, RouteSelectors, ToneSettings};
pub use settings::{safe_name, ProfileStore, UserProfile, METHOD_AUDIOGRAM, METHOD_MANUAL};
pub use transport::{
    AudioTransport, EngineStats, RingTransport, StatsSnapshot, TransportError, TransportHandle,
};

// Re-export DSP types for convenience
pub use otic_dsp::{EqBand, Preset, EQ_BANDS, PRESETS};
