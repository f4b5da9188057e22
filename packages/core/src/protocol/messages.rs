// Типы сообщений подсистемы

use crate::crypto::handshake::AgreementScheme;
use crate::crypto::messaging::EncryptionMode;
use crate::crypto::SecurityLevel;
use crate::protocol::channel::ChannelType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Communication protocol a session runs (and a message is tagged with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    QuantumKeyDistribution,
    QuantumDigitalSignature,
    QuantumTeleportation,
    EntanglementDistribution,
    QuantumSecretSharing,
    Hybrid,
    PostQuantumClassical,
}

impl ProtocolKind {
    /// Encryption mode used for payloads sent under this protocol.
    pub fn encryption_mode(self) -> EncryptionMode {
        match self {
            ProtocolKind::QuantumKeyDistribution
            | ProtocolKind::QuantumDigitalSignature
            | ProtocolKind::QuantumSecretSharing => EncryptionMode::Qkd,
            ProtocolKind::QuantumTeleportation | ProtocolKind::EntanglementDistribution => {
                EncryptionMode::Default
            }
            ProtocolKind::Hybrid => EncryptionMode::Hybrid,
            ProtocolKind::PostQuantumClassical => EncryptionMode::Pqc,
        }
    }

    /// Key agreement a session must run before it can encrypt.
    pub fn agreement_scheme(self) -> AgreementScheme {
        match self {
            ProtocolKind::PostQuantumClassical => AgreementScheme::PostQuantumKem,
            _ => AgreementScheme::Bb84,
        }
    }

    pub fn uses_entanglement(self) -> bool {
        matches!(
            self,
            ProtocolKind::QuantumTeleportation | ProtocolKind::EntanglementDistribution
        )
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolKind::QuantumKeyDistribution => "qkd",
            ProtocolKind::QuantumDigitalSignature => "quantum-digital-signature",
            ProtocolKind::QuantumTeleportation => "quantum-teleportation",
            ProtocolKind::EntanglementDistribution => "entanglement-distribution",
            ProtocolKind::QuantumSecretSharing => "quantum-secret-sharing",
            ProtocolKind::Hybrid => "hybrid",
            ProtocolKind::PostQuantumClassical => "post-quantum-classical",
        };
        f.write_str(name)
    }
}

/// Delivery priority requested by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Simulated Bell-test record attached to entanglement-based traffic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntanglementVerification {
    /// CHSH correlator; the classical bound is 2, Tsirelson's bound 2√2
    pub chsh_value: f64,
    pub fidelity: f64,
    pub verified: bool,
}

impl EntanglementVerification {
    pub fn from_fidelity(fidelity: f64) -> Self {
        let chsh_value = 2.0 * std::f64::consts::SQRT_2 * fidelity;
        Self {
            chsh_value,
            fidelity,
            verified: chsh_value > 2.0,
        }
    }
}

/// Encrypted message as held in the queue and handed to collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// UUID v4 идентификатор сообщения
    pub id: String,
    pub sender: String,
    pub receiver: String,
    #[serde(with = "serde_bytes")]
    pub ciphertext: Vec<u8>,
    pub protocol: ProtocolKind,
    pub security_level: SecurityLevel,
    pub key_id: String,
    #[serde(with = "serde_bytes")]
    pub quantum_signature: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub classical_mac: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub quantum_mac: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub channel_type: ChannelType,
    pub priority: MessagePriority,
    pub entanglement: Option<EntanglementVerification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_modes() {
        assert_eq!(
            ProtocolKind::QuantumKeyDistribution.encryption_mode(),
            EncryptionMode::Qkd
        );
        assert_eq!(ProtocolKind::Hybrid.encryption_mode(), EncryptionMode::Hybrid);
        assert_eq!(
            ProtocolKind::PostQuantumClassical.encryption_mode(),
            EncryptionMode::Pqc
        );
        assert_eq!(
            ProtocolKind::QuantumTeleportation.encryption_mode(),
            EncryptionMode::Default
        );
    }

    #[test]
    fn test_agreement_schemes() {
        assert_eq!(
            ProtocolKind::PostQuantumClassical.agreement_scheme(),
            AgreementScheme::PostQuantumKem
        );
        assert_eq!(ProtocolKind::Hybrid.agreement_scheme(), AgreementScheme::Bb84);
    }

    #[test]
    fn test_entanglement_verification() {
        assert!(EntanglementVerification::from_fidelity(0.95).verified);
        // 2√2 · 0.7 ≈ 1.98, below the classical bound
        assert!(!EntanglementVerification::from_fidelity(0.7).verified);
    }
}
