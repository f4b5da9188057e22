//! Key Agreement Protocols
//!
//! Этот модуль содержит протоколы установки ключей (key agreement).
//!
//! Цель: получить общий секретный ключ для двух участников канала и
//! оформить его как [`KeyMaterial`] для KeyStore.
//!
//! ## Протоколы
//! - **BB84**: классическая симуляция QKD (биты, базисы, шум канала)
//! - **PQ KEM**: симулированная пост-квантовая инкапсуляция для
//!   `PostQuantumClassical` сессий
//!
//! ## BB84 state machine
//! ```text
//! INITIATED → TRANSMITTED → SIFTED → ERROR_TESTED ─┬→ SUCCESS
//!                                                  ├→ THRESHOLD_EXCEEDED
//!                                                  └→ INSUFFICIENT_MATERIAL
//! ```
//!
//! Каждый запуск синхронный и не хранит состояния между вызовами.

use crate::crypto::provider::CryptoProvider;
use crate::crypto::SecurityLevel;
use crate::protocol::channel::ChannelState;
use crate::storage::models::{KeyMaterial, KeyPolicy};
use crate::utils::error::{ProtocolFailure, QlinkError, Result};
use serde::{Deserialize, Serialize};

pub mod bb84;
pub mod pq_kem;

pub use bb84::Bb84Protocol;
pub use pq_kem::PqKemAgreement;

/// Which agreement a protocol needs before it can encrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementScheme {
    Bb84,
    PostQuantumKem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementState {
    Initiated,
    Transmitted,
    Sifted,
    ErrorTested,
    Success,
    InsufficientMaterial,
    ThresholdExceeded,
}

impl AgreementState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AgreementState::Success
                | AgreementState::InsufficientMaterial
                | AgreementState::ThresholdExceeded
        )
    }
}

/// Shortest key an agreement may produce. Hybrid mode splits the key in
/// two, so each half needs at least one byte.
pub const MIN_TARGET_BITS: usize = 16;

/// Parameters of one agreement run.
#[derive(Debug, Clone, Copy)]
pub struct AgreementRequest {
    /// Key length in bits
    pub target_bits: usize,
    pub level: SecurityLevel,
    pub policy: KeyPolicy,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone)]
pub enum AgreementOutcome {
    Success(KeyMaterial),
    Failed(ProtocolFailure),
}

/// Full trace of one agreement run.
#[derive(Debug, Clone)]
pub struct AgreementReport {
    pub scheme: AgreementScheme,
    /// Every state visited, in order; the last one is terminal
    pub transitions: Vec<AgreementState>,
    pub sifted_bits: usize,
    pub test_bits: usize,
    pub observed_error: f64,
    pub outcome: AgreementOutcome,
}

impl AgreementReport {
    pub fn final_state(&self) -> AgreementState {
        match &self.outcome {
            AgreementOutcome::Success(_) => AgreementState::Success,
            AgreementOutcome::Failed(ProtocolFailure::ThresholdExceeded { .. }) => {
                AgreementState::ThresholdExceeded
            }
            AgreementOutcome::Failed(ProtocolFailure::InsufficientMaterial { .. }) => {
                AgreementState::InsufficientMaterial
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AgreementOutcome::Success(_))
    }

    pub fn key(&self) -> Option<&KeyMaterial> {
        match &self.outcome {
            AgreementOutcome::Success(key) => Some(key),
            AgreementOutcome::Failed(_) => None,
        }
    }

    pub fn into_key(self) -> Result<KeyMaterial> {
        match self.outcome {
            AgreementOutcome::Success(key) => Ok(key),
            AgreementOutcome::Failed(failure) => Err(QlinkError::ProtocolFailure(failure)),
        }
    }
}

/// Протокол установки ключей (Key Agreement)
///
/// ## Ответственность
/// - Установка общего секрета двух участников канала
/// - Оценка ошибок канала и решение, пригоден ли ключ
///
/// ## Не отвечает за:
/// - Хранение ключей (это делает KeyStore)
/// - Шифрование сообщений (это делает EncryptionEngine)
pub trait KeyAgreement<P: CryptoProvider> {
    fn scheme(&self) -> AgreementScheme;

    /// Run one agreement between `a` and `b` over `channel`.
    ///
    /// `Err` is reserved for invalid requests and primitive failures; a run
    /// that ends without a key is reported through [`AgreementOutcome::Failed`].
    fn agree(
        &mut self,
        a: &str,
        b: &str,
        channel: &ChannelState,
        request: &AgreementRequest,
    ) -> Result<AgreementReport>;
}

pub(crate) fn validate_request(
    a: &str,
    b: &str,
    channel: &ChannelState,
    request: &AgreementRequest,
) -> Result<()> {
    if request.target_bits < MIN_TARGET_BITS {
        return Err(QlinkError::Validation(format!(
            "Key agreement target length {} is below {} bits",
            request.target_bits, MIN_TARGET_BITS
        )));
    }
    if a == b {
        return Err(QlinkError::Validation(
            "Key agreement needs two distinct participants".to_string(),
        ));
    }
    if !channel.connects(a, b) {
        return Err(QlinkError::Validation(format!(
            "Channel {} does not connect {} and {}",
            channel.id, a, b
        )));
    }
    Ok(())
}
