//! Error types for chirpscan.
//!
//! Only configuration mistakes and I/O failures surface as errors. Short frames
//! and rejected onsets are ordinary data conditions and are reported through
//! `Option` and [`crate::dsp::chirp_metrics::Rejection`] instead.

use thiserror::Error;

/// Result type alias using chirpscan's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Wraps errors from the `hound` WAV library.
    #[error("Failed to read audio file: {0}")]
    AudioRead(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("Invalid configuration file: {0}")]
    Config(#[from] serde_json::Error),

    /// Window function name that does not map to a known window.
    #[error("Unknown window function: {0:?}")]
    UnknownWindow(String),

    /// Parameter outside its valid range (zero sizes, non-positive factors, ...).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The scanner only analyses single-channel recordings.
    #[error("Audio must be mono (single channel), got {0} channels")]
    NotMono(u16),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
}
