// Протокольный слой: каналы, сообщения, wire format

pub mod channel;
pub mod messages;
pub mod validation;
pub mod wire;

pub use channel::{ChannelParams, ChannelState, ChannelType, SecurityAssessment, ThreatLevel};
pub use messages::{EntanglementVerification, Message, MessagePriority, ProtocolKind};
