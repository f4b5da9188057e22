// Снимок состояния подсистемы

use crate::monitor::SecurityEvent;
use crate::protocol::channel::{ChannelState, ChannelType, ThreatLevel};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subsystem-wide counters. Each rolling mean is updated under the same lock
/// as the counter it averages over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunicationMetrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_dropped: u64,
    pub avg_encryption_ms: f64,
    pub avg_decryption_ms: f64,
    pub agreements_succeeded: u64,
    pub agreements_failed: u64,
}

impl CommunicationMetrics {
    pub fn record_encryption(&mut self, elapsed_ms: f64) {
        self.messages_sent += 1;
        self.avg_encryption_ms += (elapsed_ms - self.avg_encryption_ms) / self.messages_sent as f64;
    }

    pub fn record_decryption(&mut self, elapsed_ms: f64) {
        self.messages_received += 1;
        self.avg_decryption_ms +=
            (elapsed_ms - self.avg_decryption_ms) / self.messages_received as f64;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: String,
    pub channel_type: ChannelType,
    pub participants: Vec<String>,
    pub security_score: f64,
    pub secure_key_rate: f64,
    pub threat_level: ThreatLevel,
}

impl From<&ChannelState> for ChannelSummary {
    fn from(channel: &ChannelState) -> Self {
        Self {
            id: channel.id.clone(),
            channel_type: channel.channel_type,
            participants: channel.participants.iter().cloned().collect(),
            security_score: channel.security_score(),
            secure_key_rate: channel.secure_key_rate(),
            threat_level: channel.threat_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub generated_at: DateTime<Utc>,
    pub channel_count: usize,
    pub active_sessions: usize,
    pub total_sessions: usize,
    pub queue_depth: usize,
    pub key_count: usize,
    /// Mean security score over registered channels; 0 with no channels
    pub avg_security_score: f64,
    pub communication_metrics: CommunicationMetrics,
    pub channels: Vec<ChannelSummary>,
    pub recent_events: Vec<SecurityEvent>,
}

impl SystemStatus {
    pub fn to_json(&self) -> Result<String> {
        crate::utils::serialization::to_json(self)
    }
}
