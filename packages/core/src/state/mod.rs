// Состояние подсистемы: сессии, очередь сообщений, метрики

pub mod manager;
pub mod queue;
pub mod sessions;
pub mod status;

pub use manager::SessionManager;
pub use sessions::{AgreementRecord, Session, SessionStatus};
pub use status::{ChannelSummary, CommunicationMetrics, SystemStatus};
