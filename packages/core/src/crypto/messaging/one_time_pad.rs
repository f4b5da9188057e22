// QKD mode: XOR with a hash-expanded keystream
//
// keystream = H(key ‖ 0) ‖ H(key ‖ 1) ‖ ... truncated to the plaintext length,
// counter encoded as u64 big-endian.

use crate::crypto::provider::CryptoProvider;
use crate::error::CryptoError;

/// Expand `key` to exactly `len` bytes.
pub fn keystream<P: CryptoProvider>(key: &[u8], len: usize) -> Result<Vec<u8>, CryptoError> {
    if key.is_empty() {
        return Err(CryptoError::InvalidInputError(
            "one-time pad key cannot be empty".to_string(),
        ));
    }

    let mut stream = Vec::with_capacity(len + P::HASH_LEN);
    let mut counter: u64 = 0;
    while stream.len() < len {
        stream.extend_from_slice(&P::hash(&[key, &counter.to_be_bytes()]));
        counter += 1;
    }
    stream.truncate(len);
    Ok(stream)
}

/// XOR `data` with the keystream of `key`. Encryption and decryption are the same operation.
pub fn apply<P: CryptoProvider>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let stream = keystream::<P>(key, data.len())?;
    Ok(data.iter().zip(stream.iter()).map(|(d, k)| d ^ k).collect())
}
