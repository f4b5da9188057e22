//! Encryption Modes
//!
//! Закрытое множество режимов шифрования полезной нагрузки.
//!
//! ## Режимы
//! - **Qkd**: one-time pad, keystream = H(key ‖ counter)
//! - **Pqc**: HKDF subkey, случайный IV, AES-256-CBC/PKCS#7, выход `IV ‖ ct`
//! - **Hybrid**: Qkd с первой половиной ключа, затем Pqc со второй
//! - **Default**: то же, что Qkd
//!
//! ## Dataflow (Hybrid)
//! ```text
//! key = k1 ‖ k2   (split at len/2)
//!
//! seal:  plaintext → OTP(k1) → CBC(k2) → IV ‖ ct
//! open:  IV ‖ ct   → CBC⁻¹(k2) → OTP(k1) → plaintext
//! ```

use crate::crypto::provider::CryptoProvider;
use crate::error::CryptoError;
use serde::{Deserialize, Serialize};

pub mod block;
pub mod one_time_pad;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionMode {
    Qkd,
    Pqc,
    Hybrid,
    Default,
}

impl EncryptionMode {
    pub fn seal<P: CryptoProvider>(self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            EncryptionMode::Qkd | EncryptionMode::Default => {
                one_time_pad::apply::<P>(key, plaintext)
            }
            EncryptionMode::Pqc => block::encrypt::<P>(key, plaintext),
            EncryptionMode::Hybrid => {
                let (first, second) = split_key(key)?;
                let inner = one_time_pad::apply::<P>(first, plaintext)?;
                block::encrypt::<P>(second, &inner)
            }
        }
    }

    pub fn open<P: CryptoProvider>(self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            EncryptionMode::Qkd | EncryptionMode::Default => {
                one_time_pad::apply::<P>(key, ciphertext)
            }
            EncryptionMode::Pqc => block::decrypt::<P>(key, ciphertext),
            EncryptionMode::Hybrid => {
                let (first, second) = split_key(key)?;
                let inner = block::decrypt::<P>(second, ciphertext)?;
                one_time_pad::apply::<P>(first, &inner)
            }
        }
    }
}

fn split_key(key: &[u8]) -> Result<(&[u8], &[u8]), CryptoError> {
    if key.len() < 2 {
        return Err(CryptoError::InvalidInputError(
            "hybrid mode needs a key of at least two bytes".to_string(),
        ));
    }
    Ok(key.split_at(key.len() / 2))
}
