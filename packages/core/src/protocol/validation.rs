// Валидация параметров канала

use crate::protocol::channel::ChannelParams;
use crate::utils::error::{QlinkError, Result};
use crate::utils::validation::{clamp_positive, clamp_ratio};
use std::collections::BTreeSet;

/// Валидация идентификатора канала
pub fn validate_channel_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(QlinkError::Validation(
            "Channel id cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Валидация участников: минимум два различных непустых имени
pub fn validate_participants(participants: &[&str]) -> Result<BTreeSet<String>> {
    if participants.iter().any(|p| p.trim().is_empty()) {
        return Err(QlinkError::Validation(
            "Participant names cannot be empty".to_string(),
        ));
    }

    let set: BTreeSet<String> = participants.iter().map(|p| p.to_string()).collect();
    if set.len() < 2 {
        return Err(QlinkError::Validation(
            "A channel needs at least two distinct participants".to_string(),
        ));
    }
    Ok(set)
}

/// Clamp ratios into `[0, 1]` and rates/times to `> 0`; reject non-finite values.
pub fn sanitize_params(params: &ChannelParams) -> Result<ChannelParams> {
    Ok(ChannelParams {
        fidelity: clamp_ratio("fidelity", params.fidelity)?,
        error_rate: clamp_ratio("error_rate", params.error_rate)?,
        key_rate: clamp_positive("key_rate", params.key_rate)?,
        bandwidth: clamp_positive("bandwidth", params.bandwidth)?,
        latency: clamp_positive("latency", params.latency)?,
        availability: clamp_ratio("availability", params.availability)?,
        entanglement_rate: clamp_positive("entanglement_rate", params.entanglement_rate)?,
        coherence_time: clamp_positive("coherence_time", params.coherence_time)?,
        gate_fidelity: clamp_ratio("gate_fidelity", params.gate_fidelity)?,
        measurement_efficiency: clamp_ratio(
            "measurement_efficiency",
            params.measurement_efficiency,
        )?,
        eavesdrop_probability: clamp_ratio(
            "eavesdrop_probability",
            params.eavesdrop_probability,
        )?,
        security_parameter: clamp_ratio("security_parameter", params.security_parameter)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_participants() {
        assert!(validate_participants(&["alice", "bob"]).is_ok());
        assert!(validate_participants(&["alice", "alice"]).is_err());
        assert!(validate_participants(&["alice"]).is_err());
        assert!(validate_participants(&["alice", " "]).is_err());
    }

    #[test]
    fn test_sanitize_clamps_out_of_range_values() {
        let raw = ChannelParams {
            fidelity: 1.3,
            error_rate: -0.1,
            key_rate: 0.0,
            latency: -4.0,
            ..ChannelParams::default()
        };
        let clean = sanitize_params(&raw).unwrap();
        assert_eq!(clean.fidelity, 1.0);
        assert_eq!(clean.error_rate, 0.0);
        assert!(clean.key_rate > 0.0);
        assert!(clean.latency > 0.0);
    }

    #[test]
    fn test_sanitize_rejects_nan() {
        let raw = ChannelParams {
            coherence_time: f64::NAN,
            ..ChannelParams::default()
        };
        assert!(matches!(
            sanitize_params(&raw),
            Err(QlinkError::Validation(_))
        ));
    }
}
