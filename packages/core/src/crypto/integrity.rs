// Integrity tags attached to every encrypted message
//
// classical_mac     = HMAC(key, ciphertext)
// quantum_mac       = H(ciphertext ‖ key ‖ canonical_json(derived properties))
// quantum_signature = H(ciphertext ‖ key ‖ key_id ‖ created_at RFC 3339)

use crate::crypto::provider::CryptoProvider;
use crate::storage::models::KeyMaterial;
use crate::utils::error::{QlinkError, Result};
use crate::utils::serialization::canonical_json;
use chrono::SecondsFormat;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityTags {
    pub classical_mac: Vec<u8>,
    pub quantum_mac: Vec<u8>,
    pub quantum_signature: Vec<u8>,
}

impl IntegrityTags {
    pub fn compute<P: CryptoProvider>(key: &KeyMaterial, ciphertext: &[u8]) -> Result<Self> {
        let properties = canonical_json(&key.properties())?;
        let created_at = key
            .created_at()
            .to_rfc3339_opts(SecondsFormat::Nanos, true);

        Ok(Self {
            classical_mac: P::keyed_hash(key.bytes(), ciphertext)?,
            quantum_mac: P::hash(&[ciphertext, key.bytes(), &properties]),
            quantum_signature: P::hash(&[
                ciphertext,
                key.bytes(),
                key.id().as_bytes(),
                created_at.as_bytes(),
            ]),
        })
    }

    /// Recompute the tags for `ciphertext` and compare all three in constant time.
    pub fn verify<P: CryptoProvider>(
        &self,
        key: &KeyMaterial,
        ciphertext: &[u8],
    ) -> Result<()> {
        let expected = Self::compute::<P>(key, ciphertext)?;

        // Evaluate every comparison before branching
        let classical = expected.classical_mac.ct_eq(&self.classical_mac);
        let quantum = expected.quantum_mac.ct_eq(&self.quantum_mac);
        let signature = expected.quantum_signature.ct_eq(&self.quantum_signature);

        if bool::from(classical & quantum & signature) {
            Ok(())
        } else {
            Err(QlinkError::Integrity(format!(
                "tag mismatch for key {}",
                key.id()
            )))
        }
    }
}
