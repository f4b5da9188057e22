// In-memory хранилище ключей

use crate::crypto::SecurityLevel;
use crate::storage::models::KeyMaterial;
use crate::utils::error::{QlinkError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Default)]
struct KeyTables {
    /// Keys that may still be selected for encryption
    live: HashMap<String, KeyMaterial>,
    /// Spent or expired keys, kept so earlier messages stay decryptable
    retired: HashMap<String, KeyMaterial>,
}

/// Thread-safe key store.
///
/// Every mutation happens under one lock, so a key is never spent past
/// `max_uses` by concurrent encryptions. Invalid keys are retired lazily
/// during selection: they leave the selection pool but remain readable
/// through [`get`](Self::get).
#[derive(Default)]
pub struct KeyStore {
    tables: Mutex<KeyTables>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, KeyTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a freshly agreed key and return its id.
    pub fn insert(&self, key: KeyMaterial) -> String {
        let id = key.id().to_string();
        debug!(
            target: "qlink::keystore",
            key_id = %id,
            fingerprint = %key.fingerprint(),
            algorithm = %key.algorithm(),
            "Key stored"
        );
        self.lock().live.insert(id.clone(), key);
        id
    }

    /// Look up a key by id, live or retired.
    pub fn get(&self, key_id: &str) -> Option<KeyMaterial> {
        let tables = self.lock();
        tables
            .live
            .get(key_id)
            .or_else(|| tables.retired.get(key_id))
            .cloned()
    }

    /// Number of keys still available for selection.
    pub fn len(&self) -> usize {
        self.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().live.is_empty()
    }

    pub fn retired_len(&self) -> usize {
        self.lock().retired.len()
    }

    /// Move every key that is no longer valid at `now` out of the selection pool.
    pub fn evict_invalid(&self, now: DateTime<Utc>) -> usize {
        let mut tables = self.lock();
        let expired: Vec<String> = tables
            .live
            .iter()
            .filter(|(_, key)| !key.is_valid_at(now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(key) = tables.live.remove(id) {
                tables.retired.insert(id.clone(), key);
            }
        }
        if !expired.is_empty() {
            debug!(target: "qlink::keystore", evicted = expired.len(), "Retired invalid keys");
        }
        expired.len()
    }

    /// Forget retired keys created before `cutoff`.
    ///
    /// Messages under a purged key can no longer be decrypted.
    pub fn purge_retired(&self, cutoff: DateTime<Utc>) -> usize {
        let mut tables = self.lock();
        let before = tables.retired.len();
        tables.retired.retain(|_, key| key.created_at() >= cutoff);
        before - tables.retired.len()
    }

    /// Pick the best valid key shared by `a` and `b` with at least `min_level`.
    ///
    /// Highest level wins, then the most recently created key.
    pub fn select(
        &self,
        a: &str,
        b: &str,
        min_level: SecurityLevel,
        now: DateTime<Utc>,
    ) -> Result<KeyMaterial> {
        self.evict_invalid(now);

        let tables = self.lock();
        tables
            .live
            .values()
            .filter(|key| key.has_participant(a) && key.has_participant(b))
            .filter(|key| key.level() >= min_level)
            .max_by(|x, y| {
                x.level()
                    .cmp(&y.level())
                    .then(x.created_at().cmp(&y.created_at()))
                    .then(y.id().cmp(x.id()))
            })
            .cloned()
            .ok_or_else(|| {
                QlinkError::NoSuitableKey(format!("{}<->{} at level {}", a, b, min_level))
            })
    }

    /// Atomically spend one use of `key_id`.
    ///
    /// Returns the key as it stands after the use is recorded.
    pub fn consume(&self, key_id: &str, now: DateTime<Utc>) -> Result<KeyMaterial> {
        let mut tables = self.lock();
        let key = tables
            .live
            .get_mut(key_id)
            .ok_or_else(|| QlinkError::KeyExhausted(format!("key {} is not available for encryption", key_id)))?;

        if !key.is_valid_at(now) {
            return Err(QlinkError::KeyExhausted(format!(
                "key {} used {}/{} times, expires {}",
                key_id,
                key.uses(),
                key.max_uses(),
                key.expires_at()
            )));
        }

        key.record_use();
        Ok(key.clone())
    }
}
