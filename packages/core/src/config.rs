//! Централизованная конфигурация для Qlink Core
//!
//! Все константы и настройки подсистемы определены здесь,
//! чтобы избежать хардкода по всему проекту.

use crate::crypto::handshake::MIN_TARGET_BITS;
use crate::crypto::SecurityLevel;
use std::str::FromStr;
use std::sync::OnceLock;

/// Глобальная конфигурация (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // KEY AGREEMENT (BB84)
    // ============================================

    /// Maximum tolerated quantum bit error rate before the run is aborted
    pub qber_threshold: f64,

    /// Length of the key produced by one agreement run (in bits)
    pub key_agreement_bits: usize,

    /// Raw qubits sent per target key bit
    pub bb84_oversampling: usize,

    /// Fraction of the sifted key disclosed for error estimation
    pub test_sample_fraction: f64,

    // ============================================
    // KEY LIFECYCLE
    // ============================================

    /// Key lifetime after creation (in seconds). Default: 24 hours
    pub key_lifetime_secs: i64,

    /// Number of encryptions a single key may serve
    pub key_max_uses: u32,

    // ============================================
    // SESSIONS
    // ============================================

    /// Message queue capacity; the oldest message is dropped when full
    pub message_queue_capacity: usize,

    /// Levels at or above this get security-weighted channel selection
    pub top_tier_level: SecurityLevel,

    // ============================================
    // MONITORING
    // ============================================

    /// Inter-message gap below which traffic is tagged high-frequency (ms)
    pub high_frequency_gap_ms: i64,

    /// Inter-message gap above which traffic is tagged unusual timing (seconds)
    pub unusual_timing_gap_secs: i64,

    /// Ciphertext size above which a message is tagged large (bytes)
    pub large_message_bytes: usize,

    /// Security events older than this are pruned (hours)
    pub event_retention_hours: f64,

    /// Window of events included in a status snapshot (hours)
    pub status_event_window_hours: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Key agreement
            qber_threshold: 0.11,
            key_agreement_bits: 256,
            bb84_oversampling: 4,
            test_sample_fraction: 0.5,

            // Key lifecycle
            key_lifetime_secs: 24 * 60 * 60, // 24 hours
            key_max_uses: 1000,

            // Sessions
            message_queue_capacity: 10_000,
            top_tier_level: SecurityLevel::TopSecret,

            // Monitoring
            high_frequency_gap_ms: 100,
            unusual_timing_gap_secs: 60 * 60, // 1 hour
            large_message_bytes: 1_000_000,
            event_retention_hours: 24.0,
            status_event_window_hours: 24.0,
        }
    }
}

impl Config {
    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Построить конфигурацию, читая переопределения через `lookup`
    ///
    /// Значения, которые не парсятся или выходят за допустимые границы,
    /// игнорируются и остаются по умолчанию.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T, L>(lookup: &L, name: &str) -> Option<T>
        where
            T: FromStr,
            L: Fn(&str) -> Option<String>,
        {
            lookup(name).and_then(|val| val.parse().ok())
        }

        let mut config = Self::default();

        if let Some(bits) = parsed::<usize, _>(&lookup, "QLINK_KEY_AGREEMENT_BITS") {
            if bits >= MIN_TARGET_BITS {
                config.key_agreement_bits = bits;
            }
        }
        if let Some(value) = parsed(&lookup, "QLINK_BB84_OVERSAMPLING") {
            config.bb84_oversampling = value;
        }
        if let Some(value) = parsed(&lookup, "QLINK_KEY_MAX_USES") {
            config.key_max_uses = value;
        }
        if let Some(value) = parsed(&lookup, "QLINK_KEY_LIFETIME_SECS") {
            config.key_lifetime_secs = value;
        }
        if let Some(value) = parsed(&lookup, "QLINK_MESSAGE_QUEUE_CAPACITY") {
            config.message_queue_capacity = value;
        }
        if let Some(value) = parsed(&lookup, "QLINK_EVENT_RETENTION_HOURS") {
            config.event_retention_hours = value;
        }

        config
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }
}
