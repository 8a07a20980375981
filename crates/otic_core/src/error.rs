//! Engine Error Types

use thiserror::Error;

use crate::message::ProtocolError;
use crate::transport::TransportError;

/// Errors that can occur in the engine and its tooling
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Stream configuration error: {0}")]
    ConfigError(String),

    #[error("DSP error: {0}")]
    DspError(#[from] otic_dsp::DspError),

    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error("Failed to spawn audio thread: {0}")]
    ThreadSpawn(String),

    #[error("Protocol error: {0}")]
    ProtocolError(#[from] ProtocolError),

    #[error("Profile storage error: {0}")]
    ProfileIo(#[from] std::io::Error),

    #[error("Profile format error: {0}")]
    ProfileFormat(#[from] serde_json::Error),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid profile name: {0:?}")]
    InvalidProfileName(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
