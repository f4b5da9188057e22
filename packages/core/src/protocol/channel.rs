//! Channel model: physical parameters of a (simulated) quantum channel and
//! the security scoring derived from them.
//!
//! Channels are parameter records, not live links. Everything derived here is a
//! pure function of an immutable [`ChannelState`], so assessment and selection
//! need no locking.

use crate::crypto::SecurityLevel;
use crate::protocol::messages::ProtocolKind;
use crate::protocol::validation::{sanitize_params, validate_channel_id, validate_participants};
use crate::utils::error::{QlinkError, Result};
use crate::utils::validation::clamp01;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// QBER above which no secret key can be distilled (BB84 bound).
pub const QBER_THRESHOLD: f64 = 0.11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Fiber,
    FreeSpace,
    Satellite,
    Entangled,
    Classical,
}

impl ChannelType {
    pub fn is_entanglement_based(self) -> bool {
        matches!(self, ChannelType::Entangled)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelType::Fiber => "fiber",
            ChannelType::FreeSpace => "free-space",
            ChannelType::Satellite => "satellite",
            ChannelType::Entangled => "entangled",
            ChannelType::Classical => "classical",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

/// Physical channel parameters.
///
/// Ratios (`fidelity`, `error_rate`, `availability`, `gate_fidelity`,
/// `measurement_efficiency`, `eavesdrop_probability`, `security_parameter`)
/// live in `[0, 1]`. Rates (bits/s, pairs/s) and times (ms) are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelParams {
    pub fidelity: f64,
    pub error_rate: f64,
    pub key_rate: f64,
    pub bandwidth: f64,
    pub latency: f64,
    pub availability: f64,
    pub entanglement_rate: f64,
    pub coherence_time: f64,
    pub gate_fidelity: f64,
    pub measurement_efficiency: f64,
    pub eavesdrop_probability: f64,
    pub security_parameter: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            fidelity: 0.95,
            error_rate: 0.02,
            key_rate: 1000.0,
            bandwidth: 1_000_000.0,
            latency: 5.0,
            availability: 0.99,
            entanglement_rate: 500.0,
            coherence_time: 100.0,
            gate_fidelity: 0.99,
            measurement_efficiency: 0.9,
            eavesdrop_probability: 0.0,
            security_parameter: 0.9,
        }
    }
}

/// Result of [`ChannelState::assess`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAssessment {
    /// Weighted security score in `[0, 1]`
    pub score: f64,
    /// Upper bound on secret-key bits per second, never negative
    pub secure_key_rate: f64,
    pub threat_level: ThreatLevel,
    pub recommended_protocols: Vec<ProtocolKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    pub id: String,
    pub channel_type: ChannelType,
    pub participants: BTreeSet<String>,
    pub params: ChannelParams,
    pub established_at: DateTime<Utc>,
}

/// Shannon binary entropy `H(p)` in bits; 0 outside `(0, 1)`.
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 || p.is_nan() {
        return 0.0;
    }
    -p * p.log2() - (1.0 - p) * (1.0 - p).log2()
}

impl ChannelState {
    /// Validate and register channel parameters.
    pub fn establish(
        id: &str,
        channel_type: ChannelType,
        participants: &[&str],
        params: ChannelParams,
    ) -> Result<Self> {
        validate_channel_id(id)?;
        let participants = validate_participants(participants)?;
        let params = sanitize_params(&params)?;

        debug!(
            target: "qlink::channel",
            channel_id = %id,
            channel_type = %channel_type,
            fidelity = params.fidelity,
            error_rate = params.error_rate,
            "Channel established"
        );

        Ok(Self {
            id: id.to_string(),
            channel_type,
            participants,
            params,
            established_at: Utc::now(),
        })
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        self.participants.contains(a) && self.participants.contains(b)
    }

    pub fn secure_key_rate(&self) -> f64 {
        let p = &self.params;
        if p.error_rate > QBER_THRESHOLD {
            return 0.0;
        }
        (p.key_rate * (1.0 - 2.0 * binary_entropy(p.error_rate)) * p.fidelity).max(0.0)
    }

    pub fn security_score(&self) -> f64 {
        let p = &self.params;
        clamp01(
            0.25 * p.fidelity
                + 0.25 * (1.0 - p.error_rate / QBER_THRESHOLD)
                + 0.20 * (1.0 - p.eavesdrop_probability)
                + 0.15 * (p.coherence_time / 1000.0).min(1.0)
                + 0.15 * p.measurement_efficiency,
        )
    }

    pub fn threat_level(&self) -> ThreatLevel {
        let p = &self.params;
        if p.eavesdrop_probability > 0.1 {
            ThreatLevel::High
        } else if p.error_rate > 0.08 || p.fidelity < 0.9 {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }

    /// Protocols this channel can carry, best first. Hybrid and
    /// post-quantum classical are always present as fallbacks.
    pub fn recommended_protocols(&self) -> Vec<ProtocolKind> {
        let p = &self.params;
        let mut protocols = Vec::new();

        if p.fidelity > 0.95 && p.error_rate < 0.05 {
            protocols.push(ProtocolKind::QuantumKeyDistribution);
            protocols.push(ProtocolKind::QuantumDigitalSignature);
        }
        if p.entanglement_rate > 1000.0 && p.coherence_time > 100.0 {
            protocols.push(ProtocolKind::QuantumTeleportation);
            protocols.push(ProtocolKind::EntanglementDistribution);
        }
        if p.error_rate < 0.15 {
            protocols.push(ProtocolKind::QuantumSecretSharing);
        }

        for fallback in [ProtocolKind::Hybrid, ProtocolKind::PostQuantumClassical] {
            if !protocols.contains(&fallback) {
                protocols.push(fallback);
            }
        }
        protocols
    }

    /// Mean of fidelity, `1 - error_rate` and normalized key rate.
    pub fn performance_score(&self) -> f64 {
        let p = &self.params;
        (p.fidelity + (1.0 - p.error_rate) + (p.key_rate / 1000.0).min(1.0)) / 3.0
    }

    pub fn assess(&self) -> SecurityAssessment {
        SecurityAssessment {
            score: self.security_score(),
            secure_key_rate: self.secure_key_rate(),
            threat_level: self.threat_level(),
            recommended_protocols: self.recommended_protocols(),
        }
    }
}

/// Pick the channel with the highest weighted (security, performance,
/// availability) score. Top-tier levels weight security more heavily.
/// Ties go to the candidate seen first.
pub fn select_best<'a, I>(
    candidates: I,
    level: SecurityLevel,
    top_tier: SecurityLevel,
) -> Result<&'a ChannelState>
where
    I: IntoIterator<Item = &'a ChannelState>,
{
    let (w_security, w_performance, w_availability) = if level >= top_tier {
        (0.6, 0.2, 0.2)
    } else {
        (0.4, 0.4, 0.2)
    };

    let mut best: Option<(&ChannelState, f64)> = None;
    for channel in candidates {
        let score = w_security * channel.security_score()
            + w_performance * channel.performance_score()
            + w_availability * channel.params.availability;
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((channel, score)),
        }
    }

    best.map(|(channel, _)| channel)
        .ok_or_else(|| QlinkError::NotFound("no candidate channel".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str, params: ChannelParams) -> ChannelState {
        ChannelState::establish(id, ChannelType::Fiber, &["alice", "bob"], params).unwrap()
    }

    #[test]
    fn test_binary_entropy_edges_and_symmetry() {
        assert_eq!(binary_entropy(0.0), 0.0);
        assert_eq!(binary_entropy(1.0), 0.0);
        assert!((binary_entropy(0.5) - 1.0).abs() < 1e-12);
        for i in 1..100 {
            let p = i as f64 / 100.0;
            assert!((binary_entropy(p) - binary_entropy(1.0 - p)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_secure_key_rate_zero_above_threshold() {
        for error_rate in [0.111, 0.2, 0.5, 0.9] {
            let ch = channel(
                "noisy",
                ChannelParams {
                    error_rate,
                    ..ChannelParams::default()
                },
            );
            assert_eq!(ch.secure_key_rate(), 0.0);
        }
    }

    #[test]
    fn test_good_fiber_scenario() {
        let ch = channel(
            "fiber-1",
            ChannelParams {
                fidelity: 0.98,
                error_rate: 0.015,
                key_rate: 2000.0,
                ..ChannelParams::default()
            },
        );
        let assessment = ch.assess();
        assert!(assessment.secure_key_rate > 0.0);
        assert_eq!(assessment.threat_level, ThreatLevel::Low);
        assert!(assessment.score > 0.0 && assessment.score <= 1.0);
        assert_eq!(
            assessment.recommended_protocols[0],
            ProtocolKind::QuantumKeyDistribution
        );
    }

    #[test]
    fn test_threat_levels() {
        let high = channel(
            "tapped",
            ChannelParams {
                eavesdrop_probability: 0.3,
                ..ChannelParams::default()
            },
        );
        assert_eq!(high.threat_level(), ThreatLevel::High);

        let medium = channel(
            "lossy",
            ChannelParams {
                fidelity: 0.85,
                ..ChannelParams::default()
            },
        );
        assert_eq!(medium.threat_level(), ThreatLevel::Medium);
    }

    #[test]
    fn test_recommended_protocols_fallbacks_in_order() {
        let ch = channel(
            "poor",
            ChannelParams {
                fidelity: 0.5,
                error_rate: 0.3,
                ..ChannelParams::default()
            },
        );
        assert_eq!(
            ch.recommended_protocols(),
            vec![ProtocolKind::Hybrid, ProtocolKind::PostQuantumClassical]
        );

        let entangled = channel(
            "epr",
            ChannelParams {
                entanglement_rate: 5000.0,
                coherence_time: 500.0,
                ..ChannelParams::default()
            },
        );
        let protocols = entangled.recommended_protocols();
        assert!(protocols.contains(&ProtocolKind::QuantumTeleportation));
        assert_eq!(
            protocols[protocols.len() - 2..],
            [ProtocolKind::Hybrid, ProtocolKind::PostQuantumClassical]
        );
    }

    #[test]
    fn test_security_score_is_clamped() {
        let ch = channel(
            "awful",
            ChannelParams {
                fidelity: 0.0,
                error_rate: 1.0,
                eavesdrop_probability: 1.0,
                measurement_efficiency: 0.0,
                coherence_time: 1.0,
                ..ChannelParams::default()
            },
        );
        assert_eq!(ch.security_score(), 0.0);
    }

    #[test]
    fn test_select_best_prefers_secure_channel_for_top_tier() {
        let secure = channel(
            "secure",
            ChannelParams {
                fidelity: 0.99,
                error_rate: 0.01,
                key_rate: 200.0,
                coherence_time: 1000.0,
                ..ChannelParams::default()
            },
        );
        let fast = channel(
            "fast",
            ChannelParams {
                fidelity: 0.93,
                error_rate: 0.07,
                key_rate: 5000.0,
                coherence_time: 10.0,
                ..ChannelParams::default()
            },
        );
        let candidates = [fast, secure];
        let chosen = select_best(
            candidates.iter(),
            SecurityLevel::QuantumSecure,
            SecurityLevel::TopSecret,
        )
        .unwrap();
        assert_eq!(chosen.id, "secure");
    }

    #[test]
    fn test_select_best_ties_go_to_first_seen() {
        let first = channel("first", ChannelParams::default());
        let second = channel("second", ChannelParams::default());
        let candidates = [first, second];
        let chosen =
            select_best(candidates.iter(), SecurityLevel::Secret, SecurityLevel::TopSecret).unwrap();
        assert_eq!(chosen.id, "first");
    }

    #[test]
    fn test_select_best_empty_is_not_found() {
        let result = select_best(
            std::iter::empty(),
            SecurityLevel::Secret,
            SecurityLevel::TopSecret,
        );
        assert!(matches!(result, Err(QlinkError::NotFound(_))));
    }
}
