//! Error types for the playback engine

use thiserror::Error;

/// Result type alias using `EngineError`
pub type Result<T> = std::result::Result<T, EngineError>;

/// Playback engine errors. Every failure surfaces as one of these;
/// the engine never substitutes a default value, and the transport
/// never auto-retries.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Decode or I/O failure while loading a track. Not retryable by
    /// the engine; the caller decides whether to try again.
    #[error("failed to load track: {reason}")]
    Load { reason: String },

    /// A transport call arrived before the user-interaction signal.
    /// Retrying the same call after the signal succeeds.
    #[error("playback blocked: tap to enable audio, then retry")]
    PlaybackBlocked,

    /// Malformed URL or empty byte buffer, rejected synchronously
    /// before any backend is constructed.
    #[error("invalid track source: {reason}")]
    InvalidSource { reason: String },

    /// A capability the current backend or strategy does not offer.
    #[error("unsupported operation: {what}")]
    Unsupported { what: String },
}

impl EngineError {
    pub(crate) fn load(reason: impl Into<String>) -> Self {
        Self::Load {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_source(reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_error_carries_remediation_hint() {
        let message = EngineError::PlaybackBlocked.to_string();
        assert!(message.contains("tap to enable audio"));
    }

    #[test]
    fn load_error_includes_reason() {
        let err = EngineError::load("decode failed");
        assert!(err.to_string().contains("decode failed"));
    }
}
