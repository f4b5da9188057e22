use crate::crypto::provider::CryptoProvider;
use crate::crypto::CLASSIC_SUITE_ID;
use crate::error::CryptoError;
use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand_core::RngCore;
use sha2::{Digest, Sha256};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Concrete implementation of `CryptoProvider` for the classic suite:
/// SHA-256, HMAC-SHA256, HKDF-SHA256, AES-256-CBC and the OS CSPRNG.
pub struct ClassicSuiteProvider;

impl CryptoProvider for ClassicSuiteProvider {
    const HASH_LEN: usize = 32;
    const BLOCK_LEN: usize = 16;

    fn hash(parts: &[&[u8]]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().to_vec()
    }

    fn keyed_hash(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
            .map_err(|e| CryptoError::MacError(e.to_string()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn hkdf_derive_key(
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
        let mut okm = vec![0u8; len];
        hkdf.expand(info, &mut okm)
            .map_err(|e| CryptoError::KeyDerivationError(e.to_string()))?;
        Ok(okm)
    }

    fn block_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|e| CryptoError::BlockCipherError(e.to_string()))?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn block_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.is_empty() || ciphertext.len() % Self::BLOCK_LEN != 0 {
            return Err(CryptoError::InvalidInputError(format!(
                "ciphertext length {} is not a positive multiple of {}",
                ciphertext.len(),
                Self::BLOCK_LEN
            )));
        }
        let cipher = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|e| CryptoError::BlockCipherError(e.to_string()))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| CryptoError::PaddingError(e.to_string()))
    }

    fn random_bytes(len: usize) -> Result<Vec<u8>, CryptoError> {
        let mut bytes = vec![0u8; len];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(bytes)
    }

    fn suite_id() -> u16 {
        CLASSIC_SUITE_ID
    }
}
