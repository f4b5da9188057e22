//! End-to-end tests for the session layer
//!
//! This test suite covers:
//! - Channel registration and assessment
//! - Session initiation over shared channels
//! - Send/receive with metrics and the bounded queue
//! - Security monitor events raised by traffic

use qlink_core::monitor::{AnomalyTag, Severity};
use qlink_core::protocol::channel::ThreatLevel;
use qlink_core::state::SessionStatus;
use qlink_core::{
    ChannelParams, ChannelType, Config, MessagePriority, ProtocolKind, QlinkError, SecurityLevel,
    SessionManager,
};

/// Oversampling high enough that noiseless-ish BB84 runs always yield a key
fn test_config() -> Config {
    Config {
        bb84_oversampling: 8,
        ..Config::default()
    }
}

fn good_fiber() -> ChannelParams {
    ChannelParams {
        fidelity: 0.98,
        error_rate: 0.015,
        key_rate: 2000.0,
        ..ChannelParams::default()
    }
}

fn manager() -> SessionManager {
    qlink_core::utils::logging::init_tracing();
    let manager = SessionManager::new(test_config());
    manager
        .establish_channel("fiber-ab", ChannelType::Fiber, &["alice", "bob"], good_fiber())
        .unwrap();
    manager
        .establish_channel("fiber-cd", ChannelType::Fiber, &["carol", "dave"], good_fiber())
        .unwrap();
    manager
}

#[test]
fn test_good_fiber_assessment() {
    let manager = manager();
    let assessment = manager.assess_channel("fiber-ab").unwrap();
    assert!(assessment.secure_key_rate > 0.0);
    assert_eq!(assessment.threat_level, ThreatLevel::Low);
    assert!((0.0..=1.0).contains(&assessment.score));
}

#[test]
fn test_no_shared_channel_is_not_found() {
    let manager = manager();
    let result = manager.initiate_session("alice", "carol", SecurityLevel::Secret, None);
    assert!(matches!(result, Err(QlinkError::NotFound(_))));
}

#[test]
fn test_round_trip_each_protocol() {
    let manager = manager();
    for protocol in [
        ProtocolKind::QuantumKeyDistribution,
        ProtocolKind::Hybrid,
        ProtocolKind::PostQuantumClassical,
        ProtocolKind::EntanglementDistribution,
    ] {
        let sid = manager
            .initiate_session("alice", "bob", SecurityLevel::Secret, Some(protocol))
            .unwrap();
        assert_eq!(manager.session(&sid).unwrap().status, SessionStatus::Active);

        let to_bob = manager
            .send(&sid, "alice", b"hello bob", MessagePriority::Normal)
            .unwrap();
        let to_alice = manager
            .send(&sid, "bob", b"hello alice", MessagePriority::Low)
            .unwrap();
        assert_eq!(manager.receive(&to_bob, "bob").unwrap(), b"hello bob");
        assert_eq!(manager.receive(&to_alice, "alice").unwrap(), b"hello alice");

        // Wrong recipient is refused
        assert!(matches!(
            manager.receive(&to_bob, "alice"),
            Err(QlinkError::Authorization(_))
        ));
    }
}

#[test]
fn test_pq_session_uses_kem_key() {
    let manager = manager();
    let sid = manager
        .initiate_session(
            "alice",
            "bob",
            SecurityLevel::Confidential,
            Some(ProtocolKind::PostQuantumClassical),
        )
        .unwrap();
    let key_id = manager.session(&sid).unwrap().agreement.key_id.unwrap();
    assert_eq!(manager.key_store().get(&key_id).unwrap().algorithm(), "PQ-KEM");
}

#[test]
fn test_sessions_do_not_share_counters() {
    let manager = manager();
    let s1 = manager
        .initiate_session("alice", "bob", SecurityLevel::Secret, None)
        .unwrap();
    let s2 = manager
        .initiate_session("carol", "dave", SecurityLevel::Secret, None)
        .unwrap();

    let before = manager.session(&s2).unwrap();
    for _ in 0..5 {
        manager
            .send(&s1, "alice", b"only on s1", MessagePriority::Normal)
            .unwrap();
    }
    let after = manager.session(&s2).unwrap();

    assert_eq!(manager.session(&s1).unwrap().message_count, 5);
    assert_eq!(before, after);
}

#[test]
fn test_concurrent_sends_on_one_session() {
    let manager = manager();
    let sid = manager
        .initiate_session("alice", "bob", SecurityLevel::Secret, Some(ProtocolKind::Hybrid))
        .unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..25 {
                    manager
                        .send(&sid, "alice", b"burst", MessagePriority::Normal)
                        .unwrap();
                }
            });
        }
    });

    let session = manager.session(&sid).unwrap();
    assert_eq!(session.message_count, 100);
    assert!(session.avg_encryption_ms >= 0.0);
    let status = manager.status();
    assert_eq!(status.communication_metrics.messages_sent, 100);
    let key_id = session.agreement.key_id.unwrap();
    assert_eq!(manager.key_store().get(&key_id).unwrap().uses(), 100);
}

#[test]
fn test_queue_drops_oldest() {
    let manager: SessionManager = SessionManager::new(Config {
        message_queue_capacity: 2,
        ..test_config()
    });
    manager
        .establish_channel("fiber", ChannelType::Fiber, &["alice", "bob"], good_fiber())
        .unwrap();
    let sid = manager
        .initiate_session("alice", "bob", SecurityLevel::Secret, None)
        .unwrap();

    let ids: Vec<String> = (0..3)
        .map(|i| {
            manager
                .send(&sid, "alice", format!("m{}", i).as_bytes(), MessagePriority::Normal)
                .unwrap()
        })
        .collect();

    assert!(matches!(
        manager.receive(&ids[0], "bob"),
        Err(QlinkError::NotFound(_))
    ));
    assert_eq!(manager.receive(&ids[2], "bob").unwrap(), b"m2");
    let status = manager.status();
    assert_eq!(status.queue_depth, 2);
    assert_eq!(status.communication_metrics.messages_dropped, 1);
}

#[test]
fn test_messages_outlive_their_spent_key() {
    let manager: SessionManager = SessionManager::new(Config {
        key_max_uses: 2,
        ..test_config()
    });
    manager
        .establish_channel("fiber", ChannelType::Fiber, &["alice", "bob"], good_fiber())
        .unwrap();
    let sid = manager
        .initiate_session("alice", "bob", SecurityLevel::Secret, Some(ProtocolKind::Hybrid))
        .unwrap();

    let m1 = manager.send(&sid, "alice", b"one", MessagePriority::Normal).unwrap();
    let m2 = manager.send(&sid, "alice", b"two", MessagePriority::Normal).unwrap();
    assert_eq!(manager.receive(&m1, "bob").unwrap(), b"one");

    // The key is spent; the next send retires it
    assert!(matches!(
        manager.send(&sid, "alice", b"three", MessagePriority::Normal),
        Err(QlinkError::NoSuitableKey(_))
    ));
    assert_eq!(manager.key_store().len(), 0);
    assert_eq!(manager.key_store().retired_len(), 1);

    assert_eq!(manager.receive(&m1, "bob").unwrap(), b"one");
    assert_eq!(manager.receive(&m2, "bob").unwrap(), b"two");
}

#[test]
fn test_large_message_event() {
    let manager = manager();
    let sid = manager
        .initiate_session(
            "alice",
            "bob",
            SecurityLevel::Secret,
            Some(ProtocolKind::QuantumKeyDistribution),
        )
        .unwrap();
    let payload = vec![0x42u8; 2 * 1024 * 1024];
    let mid = manager
        .send(&sid, "alice", &payload, MessagePriority::Normal)
        .unwrap();

    let events = manager.monitor().events_for_session(&sid);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message_id, mid);
    assert!(events[0].tags.contains(&AnomalyTag::LargeMessage));
    assert!(events[0].severity >= Severity::Medium);
    assert_eq!(manager.receive(&mid, "bob").unwrap(), payload);
}

#[test]
fn test_protocol_override_and_burst_are_flagged() {
    let manager = manager();
    let sid = manager
        .initiate_session("alice", "bob", SecurityLevel::Secret, Some(ProtocolKind::Hybrid))
        .unwrap();

    manager
        .send(&sid, "alice", b"first", MessagePriority::Normal)
        .unwrap();
    let mid = manager
        .send_with_protocol(
            &sid,
            "alice",
            b"second",
            MessagePriority::Critical,
            ProtocolKind::PostQuantumClassical,
        )
        .unwrap();

    let events = manager.monitor().recent(1.0);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.message_id, mid);
    assert!(event.tags.contains(&AnomalyTag::ProtocolMismatch));
    assert!(event.tags.contains(&AnomalyTag::HighFrequency));
    assert_eq!(event.severity, Severity::High);

    // Tagged with a different mode, still decryptable by the receiver
    assert_eq!(manager.receive(&mid, "bob").unwrap(), b"second");
}

#[test]
fn test_status_snapshot() {
    let manager = manager();
    let sid = manager
        .initiate_session("alice", "bob", SecurityLevel::TopSecret, None)
        .unwrap();
    manager
        .send(&sid, "alice", b"status", MessagePriority::Normal)
        .unwrap();

    let status = manager.status();
    assert_eq!(status.channel_count, 2);
    assert_eq!(status.total_sessions, 1);
    assert_eq!(status.active_sessions, 1);
    assert_eq!(status.key_count, 1);
    assert_eq!(status.queue_depth, 1);
    assert_eq!(status.channels.len(), 2);
    assert!(status.avg_security_score > 0.0);
    assert_eq!(status.communication_metrics.agreements_succeeded, 1);

    let json = status.to_json().unwrap();
    assert!(json.contains("\"channel_count\": 2"));
}
