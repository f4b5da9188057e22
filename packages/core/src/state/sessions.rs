// Состояние сессий

use crate::crypto::handshake::{AgreementReport, AgreementScheme, AgreementState};
use crate::crypto::SecurityLevel;
use crate::protocol::messages::ProtocolKind;
use crate::utils::error::{QlinkError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Key agreement succeeded
    Active,
    /// Key agreement failed; sends fail with `NoSuitableKey` until a key appears
    Degraded,
    Closed,
}

/// What the initiating key agreement produced, without the key bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementRecord {
    pub scheme: AgreementScheme,
    pub final_state: AgreementState,
    pub transitions: Vec<AgreementState>,
    pub observed_error: f64,
    pub key_id: Option<String>,
}

impl From<&AgreementReport> for AgreementRecord {
    fn from(report: &AgreementReport) -> Self {
        Self {
            scheme: report.scheme,
            final_state: report.final_state(),
            transitions: report.transitions.clone(),
            observed_error: report.observed_error,
            key_id: report.key().map(|key| key.id().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub participants: (String, String),
    pub level: SecurityLevel,
    pub protocol: ProtocolKind,
    pub channel_id: String,
    pub start_time: DateTime<Utc>,
    pub agreement: AgreementRecord,
    pub status: SessionStatus,
    pub message_count: u64,
    /// Rolling mean of successful encryptions on this session (ms)
    pub avg_encryption_ms: f64,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(
        a: &str,
        b: &str,
        level: SecurityLevel,
        protocol: ProtocolKind,
        channel_id: &str,
        agreement: AgreementRecord,
    ) -> Self {
        let now = Utc::now();
        let status = if agreement.final_state == AgreementState::Success {
            SessionStatus::Active
        } else {
            SessionStatus::Degraded
        };

        Self {
            id: crate::utils::uuid::generate_v4(),
            participants: (a.to_string(), b.to_string()),
            level,
            protocol,
            channel_id: channel_id.to_string(),
            start_time: now,
            agreement,
            status,
            message_count: 0,
            avg_encryption_ms: 0.0,
            last_activity: now,
        }
    }

    /// The participant on the other end from `sender`.
    pub fn peer_of(&self, sender: &str) -> Result<&str> {
        let (a, b) = &self.participants;
        if sender == a {
            Ok(b)
        } else if sender == b {
            Ok(a)
        } else {
            Err(QlinkError::Authorization(format!(
                "{} is not a participant of session {}",
                sender, self.id
            )))
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != SessionStatus::Closed
    }

    /// Record one successful send.
    pub fn record_send(&mut self, elapsed_ms: f64, at: DateTime<Utc>) {
        self.message_count += 1;
        self.avg_encryption_ms += (elapsed_ms - self.avg_encryption_ms) / self.message_count as f64;
        self.last_activity = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(final_state: AgreementState) -> AgreementRecord {
        AgreementRecord {
            scheme: AgreementScheme::Bb84,
            final_state,
            transitions: vec![AgreementState::Initiated, final_state],
            observed_error: 0.0,
            key_id: None,
        }
    }

    #[test]
    fn test_status_follows_agreement() {
        let ok = Session::new(
            "alice",
            "bob",
            SecurityLevel::Secret,
            ProtocolKind::Hybrid,
            "c",
            record(AgreementState::Success),
        );
        assert_eq!(ok.status, SessionStatus::Active);

        let failed = Session::new(
            "alice",
            "bob",
            SecurityLevel::Secret,
            ProtocolKind::Hybrid,
            "c",
            record(AgreementState::ThresholdExceeded),
        );
        assert_eq!(failed.status, SessionStatus::Degraded);
        assert!(failed.is_open());
    }

    #[test]
    fn test_peer_of() {
        let session = Session::new(
            "alice",
            "bob",
            SecurityLevel::Secret,
            ProtocolKind::Hybrid,
            "c",
            record(AgreementState::Success),
        );
        assert_eq!(session.peer_of("alice").unwrap(), "bob");
        assert_eq!(session.peer_of("bob").unwrap(), "alice");
        assert!(matches!(
            session.peer_of("eve"),
            Err(QlinkError::Authorization(_))
        ));
    }

    #[test]
    fn test_rolling_mean() {
        let mut session = Session::new(
            "alice",
            "bob",
            SecurityLevel::Secret,
            ProtocolKind::Hybrid,
            "c",
            record(AgreementState::Success),
        );
        let now = Utc::now();
        for x in [2.0, 4.0, 9.0] {
            session.record_send(x, now);
        }
        assert_eq!(session.message_count, 3);
        assert!((session.avg_encryption_ms - 5.0).abs() < 1e-12);
    }
}
