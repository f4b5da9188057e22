//! Defines the CryptoProvider trait for crypto-agility.

use crate::error::CryptoError;

/// Trait that formalizes the primitive operations the encryption modes and
/// key agreements are built from. This enables crypto-agility by allowing
/// different implementations (classic, PQ-hybrid) behind the same engine.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Length of a [`CryptoProvider::hash`] digest in bytes.
    const HASH_LEN: usize;

    /// Block size of the block cipher in bytes.
    const BLOCK_LEN: usize;

    /// Hashes the concatenation of `parts`.
    fn hash(parts: &[&[u8]]) -> Vec<u8>;

    /// Computes a keyed hash (MAC) of `data` under `key`.
    fn keyed_hash(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Derives a key from input key material using HKDF.
    fn hkdf_derive_key(
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Encrypts `plaintext` in CBC mode with PKCS#7 padding.
    fn block_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypts CBC `ciphertext` and strips PKCS#7 padding.
    fn block_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Fills a buffer of `len` bytes from a cryptographically secure source.
    fn random_bytes(len: usize) -> Result<Vec<u8>, CryptoError>;

    /// Returns the SuiteID associated with this CryptoProvider.
    fn suite_id() -> u16;
}
