//! Session Manager - channels, sessions and message flow
//!
//! ## Архитектура
//!
//! ```text
//! SessionManager
//!   ├── channels        - зарегистрированные ChannelState (порядок регистрации)
//!   ├── sessions        - Session за своим Mutex, сессии независимы
//!   ├── KeyStore        - общий для EncryptionEngine и KeyAgreement
//!   ├── MessageQueue    - bounded FIFO, drop-oldest
//!   └── SecurityMonitor - наблюдает каждое отправленное сообщение
//! ```
//!
//! ## Типичный сценарий
//!
//! ```text
//! 1. manager.establish_channel("fiber-1", Fiber, &["alice", "bob"], params)
//! 2. sid = manager.initiate_session("alice", "bob", Secret, None)
//! 3. mid = manager.send(&sid, "alice", b"hello", Normal)
//! 4. pt  = manager.receive(&mid, "bob")
//! ```
//!
//! Состояние меняется только после успешной операции: сообщение попадает в
//! очередь после успешного шифрования, счётчики обновляются после успеха.

use crate::config::Config;
use crate::crypto::engine::{EncryptRequest, EncryptionEngine};
use crate::crypto::handshake::{
    AgreementReport, AgreementRequest, AgreementScheme, Bb84Protocol, KeyAgreement,
    PqKemAgreement,
};
use crate::crypto::provider::CryptoProvider;
use crate::crypto::suites::classic::ClassicSuiteProvider;
use crate::crypto::SecurityLevel;
use crate::monitor::{MonitorThresholds, SecurityMonitor};
use crate::protocol::channel::{
    select_best, ChannelParams, ChannelState, ChannelType, SecurityAssessment,
};
use crate::protocol::messages::{MessagePriority, ProtocolKind};
use crate::state::queue::MessageQueue;
use crate::state::sessions::{AgreementRecord, Session, SessionStatus};
use crate::state::status::{ChannelSummary, CommunicationMetrics, SystemStatus};
use crate::storage::{KeyPolicy, KeyStore};
use crate::utils::error::{QlinkError, Result};
use crate::utils::time::now;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

type SessionMap = HashMap<String, Arc<Mutex<Session>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(rw: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rw.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(rw: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rw.write().unwrap_or_else(PoisonError::into_inner)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

pub struct SessionManager<P: CryptoProvider = ClassicSuiteProvider> {
    config: Config,
    channels: RwLock<Vec<ChannelState>>,
    sessions: RwLock<SessionMap>,
    keys: Arc<KeyStore>,
    engine: EncryptionEngine<P>,
    queue: Mutex<MessageQueue>,
    metrics: Mutex<CommunicationMetrics>,
    monitor: SecurityMonitor,
}

impl<P: CryptoProvider> SessionManager<P> {
    /// Build an empty manager.
    ///
    /// With the default `bb84_oversampling` of 4 roughly half of all BB84
    /// runs end without enough key material, even on a noiseless channel,
    /// and the session opens degraded. Deployments should raise it, e.g.
    /// through `QLINK_BB84_OVERSAMPLING=8`.
    pub fn new(config: Config) -> Self {
        let keys = Arc::new(KeyStore::new());
        Self {
            channels: RwLock::new(Vec::new()),
            sessions: RwLock::new(HashMap::new()),
            engine: EncryptionEngine::new(Arc::clone(&keys)),
            keys,
            queue: Mutex::new(MessageQueue::new(config.message_queue_capacity)),
            metrics: Mutex::new(CommunicationMetrics::default()),
            monitor: SecurityMonitor::new(MonitorThresholds::from_config(&config)),
            config,
        }
    }

    /// Manager over the process-wide [`Config::global`].
    pub fn from_global_config() -> Self {
        Self::new(Config::global().clone())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn monitor(&self) -> &SecurityMonitor {
        &self.monitor
    }

    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    // ========================================================================
    // Channels
    // ========================================================================

    /// Validate and register a channel. Ids are unique per manager.
    pub fn establish_channel(
        &self,
        id: &str,
        channel_type: ChannelType,
        participants: &[&str],
        params: ChannelParams,
    ) -> Result<ChannelState> {
        let channel = ChannelState::establish(id, channel_type, participants, params)?;

        let mut channels = write(&self.channels);
        if channels.iter().any(|c| c.id == channel.id) {
            return Err(QlinkError::Validation(format!(
                "Channel {} is already established",
                id
            )));
        }
        channels.push(channel.clone());
        Ok(channel)
    }

    pub fn channel(&self, id: &str) -> Result<ChannelState> {
        read(&self.channels)
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| QlinkError::NotFound(format!("channel {}", id)))
    }

    pub fn assess_channel(&self, id: &str) -> Result<SecurityAssessment> {
        Ok(self.channel(id)?.assess())
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Open a session between `a` and `b` over the best channel they share.
    ///
    /// Without an explicit `protocol` the channel's first recommendation is
    /// used. A failed key agreement still yields a (degraded) session.
    ///
    /// # Errors
    ///
    /// - `Validation` if `a == b`
    /// - `NotFound` if no registered channel connects both participants
    pub fn initiate_session(
        &self,
        a: &str,
        b: &str,
        level: SecurityLevel,
        protocol: Option<ProtocolKind>,
    ) -> Result<String> {
        if a == b {
            return Err(QlinkError::Validation(
                "A session needs two distinct participants".to_string(),
            ));
        }

        let channel = {
            let channels = read(&self.channels);
            let candidates = channels.iter().filter(|c| c.connects(a, b));
            select_best(candidates, level, self.config.top_tier_level)
                .map_err(|_| QlinkError::NotFound(format!("no channel connects {} and {}", a, b)))?
                .clone()
        };

        let protocol = protocol.unwrap_or_else(|| {
            channel
                .recommended_protocols()
                .first()
                .copied()
                .unwrap_or(ProtocolKind::Hybrid)
        });

        let report = self.run_agreement(a, b, &channel, level, protocol)?;
        let record = AgreementRecord::from(&report);
        {
            let mut metrics = lock(&self.metrics);
            if report.is_success() {
                metrics.agreements_succeeded += 1;
            } else {
                metrics.agreements_failed += 1;
            }
        }
        if let Some(key) = report.key() {
            self.keys.insert(key.clone());
        }

        let session = Session::new(a, b, level, protocol, &channel.id, record);
        let id = session.id.clone();

        if session.status == SessionStatus::Degraded {
            warn!(
                target: "qlink::session",
                session_id = %id,
                state = ?session.agreement.final_state,
                observed_error = session.agreement.observed_error,
                "Session opened without a key"
            );
        } else {
            info!(
                target: "qlink::session",
                session_id = %id,
                channel_id = %channel.id,
                protocol = %protocol,
                level = %level,
                "Session established"
            );
        }

        write(&self.sessions).insert(id.clone(), Arc::new(Mutex::new(session)));
        Ok(id)
    }

    fn run_agreement(
        &self,
        a: &str,
        b: &str,
        channel: &ChannelState,
        level: SecurityLevel,
        protocol: ProtocolKind,
    ) -> Result<AgreementReport> {
        let request = AgreementRequest {
            target_bits: self.config.key_agreement_bits,
            level,
            policy: KeyPolicy::from_config(&self.config),
        };

        match protocol.agreement_scheme() {
            AgreementScheme::Bb84 => {
                Bb84Protocol::<P>::from_config(&self.config).agree(a, b, channel, &request)
            }
            AgreementScheme::PostQuantumKem => {
                PqKemAgreement::<P>::new().agree(a, b, channel, &request)
            }
        }
    }

    fn session_handle(&self, session_id: &str) -> Result<Arc<Mutex<Session>>> {
        read(&self.sessions)
            .get(session_id)
            .cloned()
            .ok_or_else(|| QlinkError::NotFound(format!("session {}", session_id)))
    }

    /// Snapshot of a session.
    pub fn session(&self, session_id: &str) -> Result<Session> {
        let handle = self.session_handle(session_id)?;
        let session = lock(&handle).clone();
        Ok(session)
    }

    pub fn close_session(&self, session_id: &str) -> Result<()> {
        let handle = self.session_handle(session_id)?;
        lock(&handle).status = SessionStatus::Closed;
        self.monitor.forget_session(session_id);
        info!(target: "qlink::session", session_id = %session_id, "Session closed");
        Ok(())
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Encrypt `plaintext` from `sender` to the other participant of the
    /// session and enqueue it. Returns the message id.
    pub fn send(
        &self,
        session_id: &str,
        sender: &str,
        plaintext: &[u8],
        priority: MessagePriority,
    ) -> Result<String> {
        self.send_inner(session_id, sender, plaintext, priority, None)
    }

    /// Like [`send`](Self::send) but tags the message with `protocol`
    /// instead of the session's own protocol.
    pub fn send_with_protocol(
        &self,
        session_id: &str,
        sender: &str,
        plaintext: &[u8],
        priority: MessagePriority,
        protocol: ProtocolKind,
    ) -> Result<String> {
        self.send_inner(session_id, sender, plaintext, priority, Some(protocol))
    }

    fn send_inner(
        &self,
        session_id: &str,
        sender: &str,
        plaintext: &[u8],
        priority: MessagePriority,
        protocol: Option<ProtocolKind>,
    ) -> Result<String> {
        let handle = self.session_handle(session_id)?;
        // Held for the whole send: the session's counter and mean move together
        let mut session = lock(&handle);

        if !session.is_open() {
            return Err(QlinkError::Validation(format!(
                "Session {} is closed",
                session_id
            )));
        }
        let receiver = session.peer_of(sender)?.to_string();
        let channel = self.channel(&session.channel_id)?;

        let start = Instant::now();
        let message = self.engine.encrypt(EncryptRequest {
            sender,
            receiver: &receiver,
            plaintext,
            protocol: protocol.unwrap_or(session.protocol),
            level: session.level,
            channel: &channel,
            priority,
        })?;
        let elapsed = elapsed_ms(start);

        let message_id = message.id.clone();
        let dropped = lock(&self.queue).push(message.clone());
        session.record_send(elapsed, message.timestamp);
        {
            let mut metrics = lock(&self.metrics);
            metrics.record_encryption(elapsed);
            if dropped.is_some() {
                metrics.messages_dropped += 1;
            }
        }

        debug!(
            target: "qlink::session",
            session_id = %session_id,
            message_id = %message_id,
            elapsed_ms = elapsed,
            "Message sent"
        );

        self.monitor.observe(&message, &session);
        Ok(message_id)
    }

    /// Decrypt a queued message on behalf of `receiver`.
    pub fn receive(&self, message_id: &str, receiver: &str) -> Result<Vec<u8>> {
        let message = lock(&self.queue)
            .find(message_id)
            .cloned()
            .ok_or_else(|| QlinkError::NotFound(format!("message {}", message_id)))?;

        if message.receiver != receiver {
            return Err(QlinkError::Authorization(format!(
                "{} is not the receiver of message {}",
                receiver, message_id
            )));
        }

        let start = Instant::now();
        let plaintext = self.engine.decrypt(&message, receiver)?;
        let elapsed = elapsed_ms(start);
        lock(&self.metrics).record_decryption(elapsed);

        debug!(
            target: "qlink::session",
            message_id = %message_id,
            elapsed_ms = elapsed,
            "Message received"
        );
        Ok(plaintext)
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn status(&self) -> SystemStatus {
        let channels: Vec<ChannelSummary> =
            read(&self.channels).iter().map(ChannelSummary::from).collect();
        let avg_security_score = if channels.is_empty() {
            0.0
        } else {
            channels.iter().map(|c| c.security_score).sum::<f64>() / channels.len() as f64
        };

        let handles: Vec<Arc<Mutex<Session>>> = read(&self.sessions).values().cloned().collect();
        let active_sessions = handles
            .iter()
            .filter(|handle| lock(handle).status == SessionStatus::Active)
            .count();

        SystemStatus {
            generated_at: now(),
            channel_count: channels.len(),
            active_sessions,
            total_sessions: handles.len(),
            queue_depth: lock(&self.queue).len(),
            key_count: self.keys.len(),
            avg_security_score,
            communication_metrics: lock(&self.metrics).clone(),
            channels,
            recent_events: self.monitor.recent(self.config.status_event_window_hours),
        }
    }
}
