// PQC mode: HKDF subkey + AES-CBC, output IV ‖ ciphertext

use crate::crypto::provider::CryptoProvider;
use crate::error::CryptoError;

/// Subkey length fed to the block cipher (AES-256)
pub const SUBKEY_LEN: usize = 32;

const SUBKEY_INFO: &[u8] = b"Qlink PQC subkey";

fn subkey<P: CryptoProvider>(key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.is_empty() {
        return Err(CryptoError::InvalidInputError(
            "block cipher key cannot be empty".to_string(),
        ));
    }
    P::hkdf_derive_key(&[], key, SUBKEY_INFO, SUBKEY_LEN)
}

pub fn encrypt<P: CryptoProvider>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let subkey = zeroize::Zeroizing::new(subkey::<P>(key)?);
    let iv = P::random_bytes(P::BLOCK_LEN)?;
    let ciphertext = P::block_encrypt(&subkey, &iv, plaintext)?;

    let mut out = Vec::with_capacity(iv.len() + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt<P: CryptoProvider>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < 2 * P::BLOCK_LEN {
        return Err(CryptoError::InvalidInputError(format!(
            "block ciphertext too short: {} bytes",
            data.len()
        )));
    }
    let subkey = zeroize::Zeroizing::new(subkey::<P>(key)?);
    let (iv, ciphertext) = data.split_at(P::BLOCK_LEN);
    P::block_decrypt(&subkey, iv, ciphertext)
}
