// Очередь сообщений: bounded FIFO, при переполнении выбрасывается самое старое

use crate::protocol::messages::Message;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct MessageQueue {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: VecDeque::new(),
        }
    }

    /// Append a message, returning the one evicted to make room (if any).
    pub fn push(&mut self, message: Message) -> Option<Message> {
        let dropped = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        dropped
    }

    pub fn find(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
