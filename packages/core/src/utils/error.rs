// Типы ошибок

use crate::error::CryptoError;
use thiserror::Error;

/// Reason a key-agreement run ended without producing key material.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolFailure {
    #[error("observed error rate {observed_error:.4} exceeds threshold")]
    ThresholdExceeded { observed_error: f64 },

    #[error("insufficient key material: {available} bits available, {required} required")]
    InsufficientMaterial { available: usize, required: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QlinkError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key agreement failed: {0}")]
    ProtocolFailure(#[from] ProtocolFailure),

    #[error("No suitable key for {0}")]
    NoSuitableKey(String),

    #[error("Key exhausted: {0}")]
    KeyExhausted(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<CryptoError> for QlinkError {
    fn from(error: CryptoError) -> Self {
        QlinkError::Crypto(error.to_string())
    }
}

impl From<bincode::Error> for QlinkError {
    fn from(error: bincode::Error) -> Self {
        QlinkError::Serialization(error.to_string())
    }
}

impl From<serde_json::Error> for QlinkError {
    fn from(error: serde_json::Error) -> Self {
        QlinkError::Serialization(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QlinkError>;
