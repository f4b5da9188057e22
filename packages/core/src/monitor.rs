//! Security monitor: anomaly tagging over session traffic.
//!
//! The monitor is owned by the session manager and sees every successfully
//! sent message. Events are append-only and pruned by age.

use crate::config::Config;
use crate::protocol::messages::Message;
use crate::state::sessions::Session;
use crate::utils::time::{gap_ms, now, within_hours};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyTag {
    HighFrequency,
    UnusualTiming,
    LargeMessage,
    ProtocolMismatch,
}

impl AnomalyTag {
    /// Severity a tag carries on its own.
    pub fn base_severity(self) -> Severity {
        match self {
            AnomalyTag::ProtocolMismatch => Severity::High,
            AnomalyTag::LargeMessage => Severity::Medium,
            AnomalyTag::HighFrequency | AnomalyTag::UnusualTiming => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn for_tags(tags: &[AnomalyTag]) -> Severity {
        let rule = if tags.contains(&AnomalyTag::ProtocolMismatch) {
            Severity::High
        } else if tags.len() > 2 {
            Severity::Medium
        } else {
            Severity::Low
        };
        tags.iter()
            .map(|tag| tag.base_severity())
            .fold(rule, Severity::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    pub message_id: String,
    pub session_id: String,
    pub tags: Vec<AnomalyTag>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorThresholds {
    pub high_frequency_gap_ms: i64,
    pub unusual_timing_gap_ms: i64,
    pub large_message_bytes: usize,
    pub retention_hours: f64,
}

impl MonitorThresholds {
    pub fn from_config(config: &Config) -> Self {
        Self {
            high_frequency_gap_ms: config.high_frequency_gap_ms,
            unusual_timing_gap_ms: config.unusual_timing_gap_secs * 1000,
            large_message_bytes: config.large_message_bytes,
            retention_hours: config.event_retention_hours,
        }
    }
}

impl Default for MonitorThresholds {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    events: VecDeque<SecurityEvent>,
    /// Timestamp of the previous message seen per session
    last_seen: HashMap<String, DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct SecurityMonitor {
    thresholds: MonitorThresholds,
    state: Mutex<MonitorState>,
}

impl SecurityMonitor {
    pub fn new(thresholds: MonitorThresholds) -> Self {
        Self {
            thresholds,
            state: Mutex::new(MonitorState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tag `message` against its session and log an event if anything is off.
    pub fn observe(&self, message: &Message, session: &Session) -> Option<SecurityEvent> {
        let mut state = self.lock();
        let previous = state
            .last_seen
            .insert(session.id.clone(), message.timestamp);

        let mut tags = Vec::new();
        if let Some(previous) = previous {
            let gap = gap_ms(previous, message.timestamp);
            if gap < self.thresholds.high_frequency_gap_ms {
                tags.push(AnomalyTag::HighFrequency);
            }
            if gap > self.thresholds.unusual_timing_gap_ms {
                tags.push(AnomalyTag::UnusualTiming);
            }
        }
        if message.ciphertext.len() > self.thresholds.large_message_bytes {
            tags.push(AnomalyTag::LargeMessage);
        }
        if message.protocol != session.protocol {
            tags.push(AnomalyTag::ProtocolMismatch);
        }

        if tags.is_empty() {
            return None;
        }

        let event = SecurityEvent {
            timestamp: message.timestamp,
            message_id: message.id.clone(),
            session_id: session.id.clone(),
            severity: Severity::for_tags(&tags),
            tags,
        };

        warn!(
            target: "qlink::monitor",
            session_id = %event.session_id,
            message_id = %event.message_id,
            tags = ?event.tags,
            severity = ?event.severity,
            "Security event"
        );

        let retention = self.thresholds.retention_hours;
        let now = message.timestamp;
        while let Some(oldest) = state.events.front() {
            if within_hours(oldest.timestamp, now, retention) {
                break;
            }
            state.events.pop_front();
        }
        state.events.push_back(event.clone());

        Some(event)
    }

    /// Events no older than `hours`.
    pub fn recent(&self, hours: f64) -> Vec<SecurityEvent> {
        self.recent_at(hours, now())
    }

    pub fn recent_at(&self, hours: f64, now: DateTime<Utc>) -> Vec<SecurityEvent> {
        self.lock()
            .events
            .iter()
            .filter(|event| within_hours(event.timestamp, now, hours))
            .cloned()
            .collect()
    }

    pub fn events_for_session(&self, session_id: &str) -> Vec<SecurityEvent> {
        self.lock()
            .events
            .iter()
            .filter(|event| event.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    /// Drop the timing state kept for a closed session. Its events stay
    /// until they age out.
    pub fn forget_session(&self, session_id: &str) {
        self.lock().last_seen.remove(session_id);
    }

    pub fn tracked_sessions(&self) -> usize {
        self.lock().last_seen.len()
    }
}
