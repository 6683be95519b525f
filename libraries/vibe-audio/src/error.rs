//! Error types for DSP components

use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// DSP error types
#[derive(Debug, Error)]
pub enum AudioError {
    /// EQ band index outside the fixed layout
    #[error("invalid EQ band index: {0}")]
    InvalidBand(usize),

    /// Parameter outside its documented range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
