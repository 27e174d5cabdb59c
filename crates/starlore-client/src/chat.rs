//! Client-side chat/message view (spec §4.10, component C12), converted
//! from the console print loop in `original_source/src/client/client.c`.
//!
//! The server owns the canonical log (`starlore_common::message::MessageLog`);
//! the client just accumulates whatever it's sent — the paginated
//! `MessageHistory` batches on join, then one `Message` at a time after.

use starlore_common::message::{Message, MessageLog};
use starlore_common::packet::{MessageBody, MessageHistoryBody};

pub struct ClientChat {
    log: MessageLog,
}

impl ClientChat {
    pub fn new() -> Self {
        ClientChat { log: MessageLog::new() }
    }

    /// Appends a history batch received during the join sequence (spec
    /// §4.7). Unknown message kinds are logged and skipped rather than
    /// aborting the whole batch.
    pub fn ingest_history(&mut self, body: &MessageHistoryBody) {
        for m in &body.history {
            self.ingest_body(m);
        }
    }

    /// Appends a single live `Message` packet.
    pub fn ingest_message(&mut self, body: &MessageBody) {
        self.ingest_body(body);
    }

    fn ingest_body(&mut self, body: &MessageBody) {
        match body.to_message() {
            Ok(message) => self.log.push(message),
            Err(e) => starlore_common::log::log_warn(&format!("dropping malformed chat message: {e}")),
        }
    }

    pub fn all(&self) -> &[Message] {
        self.log.all()
    }
}

impl Default for ClientChat {
    fn default() -> Self {
        ClientChat::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlore_common::message::MessageType;

    #[test]
    fn ingests_history_batch_in_order() {
        let mut chat = ClientChat::new();
        let history = vec![
            MessageBody { kind: 0, timestamp: 100, author: String::new(), content: "alice joined the game!".into() },
            MessageBody { kind: 0, timestamp: 101, author: String::new(), content: "bob joined the game!".into() },
        ];
        chat.ingest_history(&MessageHistoryBody { count: 2, history });

        let all = chat.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "alice joined the game!");
        assert_eq!(all[1].content, "bob joined the game!");
    }

    #[test]
    fn ingests_live_player_message() {
        let mut chat = ClientChat::new();
        chat.ingest_message(&MessageBody { kind: 1, timestamp: 200, author: "alice".into(), content: "hi".into() });

        let all = chat.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, MessageType::Player);
        assert_eq!(all[0].author, "alice");
    }

    #[test]
    fn drops_malformed_kind_without_panicking() {
        let mut chat = ClientChat::new();
        chat.ingest_message(&MessageBody { kind: 99, timestamp: 0, author: String::new(), content: String::new() });
        assert_eq!(chat.all().len(), 0);
    }
}
