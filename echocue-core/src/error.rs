//! Error types for EchoCue

use thiserror::Error;

/// Errors raised at the device and configuration boundary.
///
/// Nothing below the boundary (voices, mixer, directors) returns errors:
/// out-of-range parameters are clamped and stale world lookups are treated
/// as absent sources.
#[derive(Error, Debug)]
pub enum EchoCueError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, EchoCueError>;
