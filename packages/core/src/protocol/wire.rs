// Wire format (bincode сериализация)
// Непрозрачное представление сообщения для внешних коллабораторов

use crate::protocol::messages::Message;
use crate::utils::error::Result;
use crate::utils::serialization::{from_bytes, to_bytes};

/// Упаковать Message в бинарный формат
pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    to_bytes(message)
}

/// Распаковать бинарный формат в Message
pub fn decode_message(data: &[u8]) -> Result<Message> {
    from_bytes(data)
}
