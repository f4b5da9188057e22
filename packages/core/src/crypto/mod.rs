//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SessionManager (state)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   KeyAgreement            │  │  EncryptionEngine        │
//! │  - BB84 simulation        │  │  - key selection         │
//! │  - PQ KEM (classical)     │  │  - QKD / PQC / Hybrid    │
//! │  → KeyMaterial            │  │  - MACs + signature      │
//! └───────────────────────────┘  └──────────────────────────┘
//!                │                           │
//!                └─────────────┬─────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CryptoProvider (Crypto-Agility)                │
//! │  - Hash / keyed hash (SHA-256, HMAC-SHA256)                 │
//! │  - KDF (HKDF-SHA256)                                        │
//! │  - Block cipher (AES-256-CBC, PKCS#7)                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Модули
//!
//! - [`provider`]: CryptoProvider trait
//! - [`suites`]: реализации CryptoProvider
//! - [`handshake`]: KeyAgreement trait, BB84 и PQ KEM
//! - [`messaging`]: режимы шифрования
//! - [`integrity`]: MAC и quantum signature
//! - [`engine`]: EncryptionEngine

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Core Traits
// ============================================================================

/// CryptoProvider trait для crypto-agility
pub mod provider;

/// Key Agreement protocols (BB84, PQ KEM)
pub mod handshake;

/// Encryption modes (QKD one-time pad, PQC block cipher, Hybrid)
pub mod messaging;

// ============================================================================
// Implementations
// ============================================================================

pub mod suites;

// ============================================================================
// High-Level APIs
// ============================================================================

pub mod engine;

pub mod integrity;

// ============================================================================
// Re-exports для удобства
// ============================================================================

pub use engine::EncryptionEngine;
pub use provider::CryptoProvider;

pub type SuiteID = u16;

/// Suite ID for the classic suite
pub const CLASSIC_SUITE_ID: SuiteID = 1;

/// Confidentiality tier of keys, sessions and messages.
///
/// Ordered: a key of a higher level satisfies a request for a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
    Unclassified,
    Confidential,
    Secret,
    TopSecret,
    QuantumSecure,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecurityLevel::Unclassified => "unclassified",
            SecurityLevel::Confidential => "confidential",
            SecurityLevel::Secret => "secret",
            SecurityLevel::TopSecret => "top-secret",
            SecurityLevel::QuantumSecure => "quantum-secure",
        };
        f.write_str(name)
    }
}
