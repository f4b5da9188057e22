// Модели данных для хранилища ключей

use crate::crypto::SecurityLevel;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use zeroize::Zeroizing;

/// Properties measured during the agreement that produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedProperties {
    pub error_rate: f64,
    pub security_parameter: f64,
}

/// Lifetime policy applied to freshly agreed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    pub lifetime: Duration,
    pub max_uses: u32,
}

impl KeyPolicy {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            lifetime: Duration::seconds(config.key_lifetime_secs),
            max_uses: config.key_max_uses,
        }
    }
}

/// Shared secret produced by a successful key agreement.
///
/// A key is valid while `uses < max_uses` and `now <= expires_at`.
/// The raw bytes are wiped on drop and never appear in `Debug` output.
#[derive(Clone)]
pub struct KeyMaterial {
    id: String,
    bytes: Zeroizing<Vec<u8>>,
    algorithm: String,
    level: SecurityLevel,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    uses: u32,
    max_uses: u32,
    participants: BTreeSet<String>,
    properties: DerivedProperties,
}

impl KeyMaterial {
    /// Only key agreements mint keys.
    pub(crate) fn issue(
        bytes: Vec<u8>,
        algorithm: &str,
        level: SecurityLevel,
        participants: [&str; 2],
        properties: DerivedProperties,
        policy: KeyPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: crate::utils::uuid::generate_v4(),
            bytes: Zeroizing::new(bytes),
            algorithm: algorithm.to_string(),
            level,
            created_at: now,
            expires_at: now + policy.lifetime,
            uses: 0,
            max_uses: policy.max_uses,
            participants: participants.iter().map(|p| p.to_string()).collect(),
            properties,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn uses(&self) -> u32 {
        self.uses
    }

    pub fn max_uses(&self) -> u32 {
        self.max_uses
    }

    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.uses)
    }

    pub fn participants(&self) -> &BTreeSet<String> {
        &self.participants
    }

    pub fn properties(&self) -> DerivedProperties {
        self.properties
    }

    pub fn has_participant(&self, participant: &str) -> bool {
        self.participants.contains(participant)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.uses < self.max_uses && now <= self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Short hex digest of the key bytes, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes.as_slice());
        hex::encode(&digest[..8])
    }

    pub(crate) fn record_use(&mut self) {
        self.uses += 1;
    }

    #[cfg(test)]
    pub(crate) fn set_max_uses(&mut self, max_uses: u32) {
        self.max_uses = max_uses;
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("id", &self.id)
            .field("fingerprint", &self.fingerprint())
            .field("algorithm", &self.algorithm)
            .field("level", &self.level)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("uses", &self.uses)
            .field("max_uses", &self.max_uses)
            .field("participants", &self.participants)
            .field("properties", &self.properties)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let key = key_at("alice", "bob", SecurityLevel::Secret, now);
        assert!(key.is_valid_at(now));
        assert!(key.is_valid_at(now + Duration::hours(24)));
        assert!(!key.is_valid_at(now + Duration::hours(24) + Duration::seconds(1)));
    }

    #[test]
    fn test_uses_bound_validity() {
        let mut key = key_between("alice", "bob", SecurityLevel::Secret);
        key.set_max_uses(2);
        key.record_use();
        assert!(key.is_valid());
        key.record_use();
        assert!(!key.is_valid());
        assert_eq!(key.remaining_uses(), 0);
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let key = key_between("alice", "bob", SecurityLevel::Secret);
        let rendered = format!("{:?}", key);
        assert!(rendered.contains(&key.fingerprint()));
        assert!(!rendered.contains("bytes"));
    }
}
