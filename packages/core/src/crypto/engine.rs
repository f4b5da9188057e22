//! Encryption Engine - key selection, encryption modes and integrity
//!
//! Объединяет KeyStore, режимы шифрования и integrity tags в единый API.
//!
//! ## Encrypt
//! ```text
//! select(a, b, level) → consume(key_id) → mode.seal(key, pt)
//!   → IntegrityTags::compute → Message
//! ```
//!
//! ## Decrypt
//! ```text
//! receiver == caller? → key lookup → caller ∈ participants?
//!   → IntegrityTags::verify → mode.open
//! ```
//!
//! ## Не отвечает за
//!
//! - Установку ключей (это делает KeyAgreement)
//! - Очередь сообщений и метрики (это делает SessionManager)

use crate::crypto::integrity::IntegrityTags;
use crate::crypto::provider::CryptoProvider;
use crate::crypto::suites::classic::ClassicSuiteProvider;
use crate::crypto::SecurityLevel;
use crate::protocol::channel::ChannelState;
use crate::protocol::messages::{EntanglementVerification, Message, MessagePriority, ProtocolKind};
use crate::storage::KeyStore;
use crate::utils::error::{QlinkError, Result};
use crate::utils::time::now;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything needed to produce one encrypted [`Message`].
#[derive(Debug, Clone, Copy)]
pub struct EncryptRequest<'a> {
    pub sender: &'a str,
    pub receiver: &'a str,
    pub plaintext: &'a [u8],
    pub protocol: ProtocolKind,
    pub level: SecurityLevel,
    pub channel: &'a ChannelState,
    pub priority: MessagePriority,
}

pub struct EncryptionEngine<P: CryptoProvider = ClassicSuiteProvider> {
    keys: Arc<KeyStore>,
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> EncryptionEngine<P> {
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self {
            keys,
            _phantom: PhantomData,
        }
    }

    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    /// Encrypt a payload under the best key the two parties share.
    ///
    /// # Errors
    ///
    /// - `NoSuitableKey` if no valid key of at least `request.level` exists
    /// - `KeyExhausted` if the selected key was spent concurrently
    pub fn encrypt(&self, request: EncryptRequest<'_>) -> Result<Message> {
        let now = now();
        let selected = self
            .keys
            .select(request.sender, request.receiver, request.level, now)?;
        let key = self.keys.consume(selected.id(), now)?;

        let mode = request.protocol.encryption_mode();
        let ciphertext = mode.seal::<P>(key.bytes(), request.plaintext)?;
        let tags = IntegrityTags::compute::<P>(&key, &ciphertext)?;

        let channel = request.channel;
        let entanglement = if channel.channel_type.is_entanglement_based()
            || request.protocol.uses_entanglement()
        {
            Some(EntanglementVerification::from_fidelity(channel.params.fidelity))
        } else {
            None
        };

        debug!(
            target: "qlink::engine",
            suite = P::suite_id(),
            key_id = %key.id(),
            fingerprint = %key.fingerprint(),
            mode = ?mode,
            remaining_uses = key.remaining_uses(),
            ciphertext_len = ciphertext.len(),
            "Payload encrypted"
        );

        Ok(Message {
            id: crate::utils::uuid::generate_v4(),
            sender: request.sender.to_string(),
            receiver: request.receiver.to_string(),
            ciphertext,
            protocol: request.protocol,
            security_level: request.level,
            key_id: key.id().to_string(),
            quantum_signature: tags.quantum_signature,
            classical_mac: tags.classical_mac,
            quantum_mac: tags.quantum_mac,
            timestamp: now,
            channel_type: channel.channel_type,
            priority: request.priority,
            entanglement,
        })
    }

    /// Verify and decrypt `message` on behalf of `caller`.
    ///
    /// Authorization is checked before integrity, integrity before decryption.
    pub fn decrypt(&self, message: &Message, caller: &str) -> Result<Vec<u8>> {
        if message.receiver != caller {
            return Err(QlinkError::Authorization(format!(
                "{} is not the receiver of message {}",
                caller, message.id
            )));
        }

        let key = self
            .keys
            .get(&message.key_id)
            .ok_or_else(|| QlinkError::NoSuitableKey(format!("key {}", message.key_id)))?;

        if !key.has_participant(caller) {
            return Err(QlinkError::Authorization(format!(
                "{} does not hold key {}",
                caller,
                key.id()
            )));
        }

        let tags = IntegrityTags {
            classical_mac: message.classical_mac.clone(),
            quantum_mac: message.quantum_mac.clone(),
            quantum_signature: message.quantum_signature.clone(),
        };
        if let Err(e) = tags.verify::<P>(&key, &message.ciphertext) {
            warn!(target: "qlink::engine", message_id = %message.id, "Integrity check failed");
            return Err(e);
        }

        let plaintext = message
            .protocol
            .encryption_mode()
            .open::<P>(key.bytes(), &message.ciphertext)?;
        Ok(plaintext)
    }
}
