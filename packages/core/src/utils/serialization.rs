// Сериализация

use crate::utils::error::Result;
use serde::{Deserialize, Serialize};

pub fn to_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(data)?)
}

pub fn from_bytes<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn to_json<T: Serialize>(data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Stable byte encoding used when a value feeds a hash.
pub fn canonical_json<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(data)?)
}
