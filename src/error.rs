//! Error types for the peerpulse evaluation service
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for peerpulse operations
#[derive(Error, Debug)]
pub enum PeerpulseError {
    /// Domain invariant violated during entity construction or transition
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write rejected because an equivalent record already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Field encryption failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Field decryption failed. Carries no detail: a wrong key and
    /// corrupted ciphertext must be indistinguishable to callers.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Invalid identifier format
    #[error("Invalid id: {0}")]
    InvalidId(#[from] uuid::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for peerpulse operations
pub type Result<T> = std::result::Result<T, PeerpulseError>;

/// Convert anyhow::Error to PeerpulseError
impl From<anyhow::Error> for PeerpulseError {
    fn from(err: anyhow::Error) -> Self {
        PeerpulseError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PeerpulseError::NotFound("evaluation abc".to_string());
        assert_eq!(err.to_string(), "Not found: evaluation abc");
    }

    #[test]
    fn test_decryption_error_is_generic() {
        // Wrong key and corrupt data must produce the same message.
        assert_eq!(
            PeerpulseError::DecryptionFailed.to_string(),
            "decryption failed"
        );
    }

    #[test]
    fn test_error_conversion() {
        let uuid_err = uuid::Uuid::parse_str("invalid");
        assert!(uuid_err.is_err());

        let err: PeerpulseError = uuid_err.unwrap_err().into();
        assert!(matches!(err, PeerpulseError::InvalidId(_)));
    }
}
