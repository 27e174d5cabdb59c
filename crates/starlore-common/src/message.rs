//! Chat / system message log (spec §3, §4.10), converted from
//! `packet_message_t` in `original_source/src/common/packet.h`.

use crate::consts::{MESSAGE_MAX_CONTENT_LENGTH, PLAYER_MAX_NAME_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    System = 0,
    Player = 1,
}

impl MessageType {
    pub fn from_wire(v: u32) -> Option<MessageType> {
        match v {
            0 => Some(MessageType::System),
            1 => Some(MessageType::Player),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageType,
    /// Seconds since the Unix epoch, stamped server-side on receipt.
    pub timestamp: i64,
    pub author: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            kind: MessageType::System,
            timestamp: chrono::Utc::now().timestamp(),
            author: String::new(),
            content: truncate(content.into(), MESSAGE_MAX_CONTENT_LENGTH),
        }
    }

    pub fn player(author: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Message {
            kind: MessageType::Player,
            timestamp,
            author: truncate(author.into(), PLAYER_MAX_NAME_LENGTH),
            content: truncate(content.into(), MESSAGE_MAX_CONTENT_LENGTH),
        }
    }
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        s.truncate(max);
    }
    s
}

/// Bounded append-only history kept on the server (spec §4.10). Joining
/// clients are paginated `HISTORY_BATCH` entries at a time.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        MessageLog { entries: Vec::new() }
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn all(&self) -> &[Message] {
        &self.entries
    }

    /// Splits the whole history into batches of at most `batch_size`,
    /// mirroring the `counter >= MAX_MESSAGE_HISTORY_LENGTH` flush in
    /// `original_source/src/server/server.c`.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = &[Message]> {
        self.entries.chunks(batch_size.max(1))
    }
}
