//! BB84 Protocol Simulation
//!
//! Классическая модель BB84: нет физического квантового канала, только
//! случайные биты, базисы и шум с вероятностью `error_rate` канала.
//!
//! ## Dataflow
//!
//! ```text
//! Alice                                    Bob
//! -----                                    ---
//! 4·n random bits (CSPRNG) + bases
//!   ↓ transmit (each bit flips with p = error_rate)
//!                                          4·n random bases, measure
//! compare bases publicly (sifting) ←→
//!   ↓
//! disclose floor(0.5·sifted) random positions, count mismatches
//!   ↓
//! QBER > 0.11 → abort; else keep undisclosed bits, truncate to n
//! ```
//!
//! Шум и выбор базисов моделируют физику и берутся из обычного PRNG;
//! биты, которые становятся ключом, берутся из CSPRNG провайдера.

use crate::config::Config;
use crate::crypto::handshake::{
    validate_request, AgreementOutcome, AgreementReport, AgreementRequest, AgreementScheme,
    AgreementState, KeyAgreement,
};
use crate::crypto::provider::CryptoProvider;
use crate::protocol::channel::{ChannelState, QBER_THRESHOLD};
use crate::storage::models::{DerivedProperties, KeyMaterial};
use crate::utils::error::{ProtocolFailure, QlinkError, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::marker::PhantomData;
use tracing::{debug, info};

pub const ALGORITHM: &str = "BB84";

pub struct Bb84Protocol<P: CryptoProvider> {
    oversampling: usize,
    test_fraction: f64,
    threshold: f64,
    noise: StdRng,
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> Bb84Protocol<P> {
    pub fn new() -> Self {
        Self {
            oversampling: 4,
            test_fraction: 0.5,
            threshold: QBER_THRESHOLD,
            noise: StdRng::from_entropy(),
            _phantom: PhantomData,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            oversampling: config.bb84_oversampling,
            test_fraction: config.test_sample_fraction,
            threshold: config.qber_threshold,
            ..Self::new()
        }
    }

    /// Raw qubits transmitted per requested key bit.
    pub fn with_oversampling(mut self, factor: usize) -> Self {
        self.oversampling = factor;
        self
    }

    /// Make basis choice, channel noise and test sampling reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.noise = StdRng::seed_from_u64(seed);
        self
    }

    fn random_bases(&mut self, len: usize) -> Vec<bool> {
        (0..len).map(|_| self.noise.gen::<bool>()).collect()
    }

    fn sender_bits(len: usize) -> Result<Vec<u8>> {
        let raw = P::random_bytes((len + 7) / 8)?;
        Ok((0..len).map(|i| (raw[i / 8] >> (7 - i % 8)) & 1).collect())
    }
}

impl<P: CryptoProvider> Default for Bb84Protocol<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pack bits big-endian into bytes, zero-padding the final byte.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; (bits.len() + 7) / 8];
    for (i, bit) in bits.iter().enumerate() {
        bytes[i / 8] |= (bit & 1) << (7 - i % 8);
    }
    bytes
}

impl<P: CryptoProvider> KeyAgreement<P> for Bb84Protocol<P> {
    fn scheme(&self) -> AgreementScheme {
        AgreementScheme::Bb84
    }

    fn agree(
        &mut self,
        a: &str,
        b: &str,
        channel: &ChannelState,
        request: &AgreementRequest,
    ) -> Result<AgreementReport> {
        validate_request(a, b, channel, request)?;
        if self.oversampling == 0 {
            return Err(QlinkError::Validation(
                "BB84 oversampling factor must be positive".to_string(),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction <= 1.0) {
            return Err(QlinkError::Validation(format!(
                "BB84 test fraction {} outside (0, 1]",
                self.test_fraction
            )));
        }

        let mut transitions = vec![AgreementState::Initiated];
        let raw_len = self.oversampling * request.target_bits;

        // Transmission
        let sender_bits = Self::sender_bits(raw_len)?;
        let sender_bases = self.random_bases(raw_len);
        let error_rate = channel.params.error_rate;
        let received_bits: Vec<u8> = sender_bits
            .iter()
            .map(|bit| {
                if self.noise.gen_bool(error_rate) {
                    bit ^ 1
                } else {
                    *bit
                }
            })
            .collect();
        let receiver_bases = self.random_bases(raw_len);
        transitions.push(AgreementState::Transmitted);
        debug!(target: "qlink::bb84", channel_id = %channel.id, raw_len, "Qubits transmitted");

        // Sifting
        let (sifted_sender, sifted_receiver): (Vec<u8>, Vec<u8>) = (0..raw_len)
            .filter(|&i| sender_bases[i] == receiver_bases[i])
            .map(|i| (sender_bits[i], received_bits[i]))
            .unzip();
        let sifted_len = sifted_sender.len();
        transitions.push(AgreementState::Sifted);
        debug!(target: "qlink::bb84", sifted_len, "Bases reconciled");

        // Error estimation on a disclosed random sample
        let test_len = (sifted_len as f64 * self.test_fraction).floor() as usize;
        let mut disclosed = vec![false; sifted_len];
        for idx in rand::seq::index::sample(&mut self.noise, sifted_len, test_len).iter() {
            disclosed[idx] = true;
        }
        let mismatches = (0..sifted_len)
            .filter(|&i| disclosed[i] && sifted_sender[i] != sifted_receiver[i])
            .count();
        let observed_error = if test_len == 0 {
            0.0
        } else {
            mismatches as f64 / test_len as f64
        };
        transitions.push(AgreementState::ErrorTested);

        let outcome = if observed_error > self.threshold {
            AgreementOutcome::Failed(ProtocolFailure::ThresholdExceeded { observed_error })
        } else {
            let remainder: Vec<u8> = (0..sifted_len)
                .filter(|&i| !disclosed[i])
                .map(|i| sifted_sender[i])
                .collect();

            if remainder.len() < request.target_bits {
                AgreementOutcome::Failed(ProtocolFailure::InsufficientMaterial {
                    available: remainder.len(),
                    required: request.target_bits,
                })
            } else {
                let key = KeyMaterial::issue(
                    pack_bits(&remainder[..request.target_bits]),
                    ALGORITHM,
                    request.level,
                    [a, b],
                    DerivedProperties {
                        error_rate: observed_error,
                        security_parameter: 1.0 - 2.0 * observed_error,
                    },
                    request.policy,
                    Utc::now(),
                );
                AgreementOutcome::Success(key)
            }
        };

        let mut report = AgreementReport {
            scheme: AgreementScheme::Bb84,
            transitions,
            sifted_bits: sifted_len,
            test_bits: test_len,
            observed_error,
            outcome,
        };
        report.transitions.push(report.final_state());

        info!(
            target: "qlink::bb84",
            channel_id = %channel.id,
            state = ?report.final_state(),
            sifted_bits = sifted_len,
            test_bits = test_len,
            observed_error,
            "BB84 run finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::suites::classic::ClassicSuiteProvider;
    use crate::crypto::SecurityLevel;
    use crate::protocol::channel::{ChannelParams, ChannelType};
    use crate::storage::models::KeyPolicy;
    use chrono::Duration;

    type Bb84 = Bb84Protocol<ClassicSuiteProvider>;

    fn channel(error_rate: f64) -> ChannelState {
        ChannelState::establish(
            "fiber",
            ChannelType::Fiber,
            &["alice", "bob"],
            ChannelParams {
                error_rate,
                ..ChannelParams::default()
            },
        )
        .unwrap()
    }

    fn request(target_bits: usize) -> AgreementRequest {
        AgreementRequest {
            target_bits,
            level: SecurityLevel::Secret,
            policy: KeyPolicy {
                lifetime: Duration::hours(24),
                max_uses: 1000,
            },
        }
    }

    #[test]
    fn test_pack_bits_big_endian_zero_padded() {
        assert_eq!(pack_bits(&[1, 0, 1, 1, 0, 0, 0, 1]), vec![0b1011_0001]);
        assert_eq!(pack_bits(&[1, 1, 0]), vec![0b1100_0000]);
        assert!(pack_bits(&[]).is_empty());
    }

    #[test]
    fn test_noiseless_runs_never_exceed_threshold() {
        let ch = channel(0.0);
        let mut bb84 = Bb84::new().with_seed(7);
        let mut successes = 0;
        for _ in 0..100 {
            let report = bb84.agree("alice", "bob", &ch, &request(128)).unwrap();
            assert_eq!(report.observed_error, 0.0);
            match report.outcome {
                AgreementOutcome::Success(ref key) => {
                    successes += 1;
                    assert_eq!(key.properties().security_parameter, 1.0);
                    assert_eq!(key.bytes().len(), 16);
                }
                AgreementOutcome::Failed(ref failure) => assert!(matches!(
                    failure,
                    ProtocolFailure::InsufficientMaterial { .. }
                )),
            }
        }
        assert!(successes > 0);
    }

    #[test]
    fn test_noiseless_runs_succeed_with_headroom() {
        let ch = channel(0.0);
        let mut bb84 = Bb84::new().with_oversampling(6).with_seed(11);
        let successes = (0..200)
            .filter(|_| bb84.agree("alice", "bob", &ch, &request(256)).unwrap().is_success())
            .count();
        assert!(successes >= 195, "only {} of 200 runs succeeded", successes);
    }

    #[test]
    fn test_noisy_channel_exceeds_threshold() {
        let ch = channel(0.25);
        let mut bb84 = Bb84::new().with_seed(3);
        for _ in 0..50 {
            let report = bb84.agree("alice", "bob", &ch, &request(256)).unwrap();
            assert_eq!(report.final_state(), AgreementState::ThresholdExceeded);
            assert!(report.key().is_none());
            assert!(matches!(
                report.into_key(),
                Err(QlinkError::ProtocolFailure(ProtocolFailure::ThresholdExceeded { .. }))
            ));
        }
    }

    #[test]
    fn test_transitions_follow_state_machine() {
        let ch = channel(0.0);
        let mut bb84 = Bb84::new().with_oversampling(8).with_seed(5);
        let report = bb84.agree("alice", "bob", &ch, &request(64)).unwrap();
        assert_eq!(
            report.transitions,
            vec![
                AgreementState::Initiated,
                AgreementState::Transmitted,
                AgreementState::Sifted,
                AgreementState::ErrorTested,
                AgreementState::Success,
            ]
        );
        assert!(report.transitions.last().unwrap().is_terminal());
        assert_eq!(report.test_bits, report.sifted_bits / 2);
    }

    #[test]
    fn test_successful_key_metadata() {
        let ch = channel(0.02);
        let mut bb84 = Bb84::new().with_oversampling(8).with_seed(9);
        let key = bb84
            .agree("alice", "bob", &ch, &request(256))
            .unwrap()
            .into_key()
            .unwrap();
        assert_eq!(key.algorithm(), ALGORITHM);
        assert_eq!(key.max_uses(), 1000);
        assert!(key.has_participant("alice") && key.has_participant("bob"));
        let props = key.properties();
        assert!((props.security_parameter - (1.0 - 2.0 * props.error_rate)).abs() < 1e-12);
        assert_eq!(key.expires_at() - key.created_at(), Duration::hours(24));
    }

    #[test]
    fn test_rejects_outsiders_and_empty_target() {
        let ch = channel(0.0);
        let mut bb84 = Bb84::new();
        assert!(matches!(
            bb84.agree("alice", "mallory", &ch, &request(64)),
            Err(QlinkError::Validation(_))
        ));
        assert!(matches!(
            bb84.agree("alice", "bob", &ch, &request(0)),
            Err(QlinkError::Validation(_))
        ));
        // A one-byte key cannot be split for hybrid encryption
        assert!(matches!(
            bb84.agree("alice", "bob", &ch, &request(8)),
            Err(QlinkError::Validation(_))
        ));
    }
}
