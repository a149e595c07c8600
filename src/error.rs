//! Error types for the sealing engine.
//!
//! Sequoia reports failures as `anyhow::Error`; they are flattened into the
//! message of the matching variant so callers can branch on the kind.

use thiserror::Error;

/// Errors that can occur while sealing a payload.
#[derive(Debug, Error)]
pub enum SealError {
    /// The key-ring bytes are not a valid OpenPGP key-ring encoding.
    #[error("Malformed key ring: {0}")]
    Parse(String),

    /// No key ring contains a key usable for encryption.
    #[error("No encryption-capable key found in key ring")]
    KeyNotFound,

    /// The session key or the payload could not be encrypted.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The literal data packet could not be assembled.
    #[error("Could not assemble literal data: {0}")]
    Write(String),
}

impl SealError {
    pub(crate) fn parse(err: impl std::fmt::Display) -> Self {
        Self::Parse(format!("{err:#}"))
    }

    pub(crate) fn encryption(err: impl std::fmt::Display) -> Self {
        Self::Encryption(format!("{err:#}"))
    }

    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        Self::Write(format!("{err:#}"))
    }
}

/// Result type alias for sealing operations.
pub type SealResult<T> = Result<T, SealError>;
