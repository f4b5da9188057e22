use thiserror::Error;

/// Failures raised by cryptographic primitives behind [`crate::crypto::CryptoProvider`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),
    #[error("Block cipher setup failed: {0}")]
    BlockCipherError(String),
    #[error("Invalid padding: {0}")]
    PaddingError(String),
    #[error("MAC computation failed: {0}")]
    MacError(String),
    #[error("Random generation failed: {0}")]
    RandomnessError(String),
    #[error("Invalid input: {0}")]
    InvalidInputError(String),
}

impl From<rand::Error> for CryptoError {
    fn from(err: rand::Error) -> Self {
        CryptoError::RandomnessError(err.to_string())
    }
}
