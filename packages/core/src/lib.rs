// Qlink Core
// Simulated QKD key agreement, layered encryption and secure sessions

#![warn(clippy::all)]

// Модули
pub mod config;
pub mod crypto;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod utils;

// Re-exports для удобства
pub use config::Config;
pub use crypto::{EncryptionEngine, SecurityLevel};
pub use monitor::{AnomalyTag, SecurityEvent, SecurityMonitor, Severity};
pub use protocol::{ChannelParams, ChannelType, Message, MessagePriority, ProtocolKind};
pub use state::{SessionManager, SystemStatus};
pub use storage::KeyStore;
pub use utils::error::{QlinkError, Result};
