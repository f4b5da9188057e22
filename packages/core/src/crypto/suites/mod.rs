//! Криптографические наборы (Crypto Suites)
//!
//! Этот модуль содержит реализации CryptoProvider trait.
//!
//! ## Доступные наборы
//!
//! ### Classic Suite (текущий)
//! - **Hash**: SHA-256
//! - **MAC**: HMAC-SHA256
//! - **KDF**: HKDF-SHA256
//! - **Block cipher**: AES-256-CBC + PKCS#7
//! - **RNG**: OS CSPRNG
//! - **Suite ID**: 1
//!
//! ## Выбор suite
//!
//! ```rust
//! use qlink_core::crypto::suites::classic::ClassicSuiteProvider;
//! use qlink_core::crypto::provider::CryptoProvider;
//!
//! type MySuite = ClassicSuiteProvider;
//!
//! let digest = MySuite::hash(&[b"hello"]);
//! assert_eq!(digest.len(), MySuite::HASH_LEN);
//! ```

pub mod classic;
