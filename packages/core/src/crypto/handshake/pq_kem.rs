// Simulated post-quantum KEM agreement
//
// Инкапсуляция моделируется: общий секрет берётся из CSPRNG провайдера и
// пропускается через HKDF с привязкой к каналу и участникам. Настоящий KEM
// здесь не нужен, важна только форма результата (KeyMaterial в KeyStore).

use crate::crypto::handshake::{
    validate_request, AgreementOutcome, AgreementReport, AgreementRequest, AgreementScheme,
    AgreementState, KeyAgreement,
};
use crate::crypto::provider::CryptoProvider;
use crate::protocol::channel::ChannelState;
use crate::storage::models::{DerivedProperties, KeyMaterial};
use crate::utils::error::Result;
use chrono::Utc;
use std::marker::PhantomData;
use tracing::info;

pub const ALGORITHM: &str = "PQ-KEM";

const KEM_INFO: &[u8] = b"Qlink PQ KEM shared secret";

pub struct PqKemAgreement<P: CryptoProvider> {
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> PqKemAgreement<P> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<P: CryptoProvider> Default for PqKemAgreement<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: CryptoProvider> KeyAgreement<P> for PqKemAgreement<P> {
    fn scheme(&self) -> AgreementScheme {
        AgreementScheme::PostQuantumKem
    }

    fn agree(
        &mut self,
        a: &str,
        b: &str,
        channel: &ChannelState,
        request: &AgreementRequest,
    ) -> Result<AgreementReport> {
        validate_request(a, b, channel, request)?;

        let len = (request.target_bits + 7) / 8;
        let encapsulated = P::random_bytes(len)?;
        let salt = P::hash(&[channel.id.as_bytes(), a.as_bytes(), b.as_bytes()]);
        let shared = P::hkdf_derive_key(&salt, &encapsulated, KEM_INFO, len)?;

        let key = KeyMaterial::issue(
            shared,
            ALGORITHM,
            request.level,
            [a, b],
            DerivedProperties {
                error_rate: 0.0,
                security_parameter: 1.0,
            },
            request.policy,
            Utc::now(),
        );

        info!(
            target: "qlink::keystore",
            channel_id = %channel.id,
            key_id = %key.id(),
            "PQ KEM shared secret established"
        );

        Ok(AgreementReport {
            scheme: AgreementScheme::PostQuantumKem,
            transitions: vec![
                AgreementState::Initiated,
                AgreementState::Transmitted,
                AgreementState::Success,
            ],
            sifted_bits: 0,
            test_bits: 0,
            observed_error: 0.0,
            outcome: AgreementOutcome::Success(key),
        })
    }
}
