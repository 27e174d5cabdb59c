//! Server-side input queue (spec §4.6, component C7), converted from
//! `myq2_common::net_queue::PacketQueue`: a bounded channel decouples the
//! per-connection IO threads (producers) from the simulation thread (the
//! single consumer), so a slow tick never blocks a socket read.
//!
//! Unlike `net_queue.rs`'s per-socket queue, StarLore keeps exactly one
//! queue shared across every connected client (spec §4.6: "one bounded ring
//! buffer of `PlayerKeypress` packets across all clients"), which is what
//! gives the simulation tick its single, globally-ordered drain.

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

use starlore_common::consts::INPUT_RING_BUFFER_CAPACITY;
use starlore_common::packet::PlayerKeypressBody;

/// Handed to every connection's reader thread; cloning is cheap (an `Arc`
/// internally via crossbeam's `Sender`).
#[derive(Clone)]
pub struct InputQueueSender {
    sender: Sender<PlayerKeypressBody>,
}

impl InputQueueSender {
    /// Enqueues a keypress without blocking. Returns `false` on a full
    /// queue or a disconnected simulation thread — the caller logs and
    /// drops (spec §4.6/§7: resource exhaustion is log-and-drop, never a
    /// blocking backpressure).
    pub fn try_send(&self, keypress: PlayerKeypressBody) -> bool {
        match self.sender.try_send(keypress) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Owned by the simulation thread; the single consumer of the queue.
pub struct InputQueue {
    sender: Sender<PlayerKeypressBody>,
    receiver: Receiver<PlayerKeypressBody>,
}

impl InputQueue {
    pub fn new() -> Self {
        InputQueue::with_capacity(INPUT_RING_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        InputQueue { sender, receiver }
    }

    pub fn sender(&self) -> InputQueueSender {
        InputQueueSender { sender: self.sender.clone() }
    }

    /// Drains at most `limit` pending keypresses in enqueue order (spec
    /// §4.6 step 1, `PROCESSED_INPUT_LIMIT_PER_UPDATE`).
    pub fn drain(&self, limit: usize) -> Vec<PlayerKeypressBody> {
        let mut drained = Vec::new();
        while drained.len() < limit {
            match self.receiver.try_recv() {
                Ok(keypress) => drained.push(keypress),
                Err(_) => break,
            }
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        InputQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypress(seq_nr: u32) -> PlayerKeypressBody {
        PlayerKeypressBody { id: 1000, seq_nr, key: 0, mods: 0, action: 1 }
    }

    #[test]
    fn drains_in_enqueue_order() {
        let queue = InputQueue::with_capacity(8);
        let sender = queue.sender();
        sender.try_send(keypress(1));
        sender.try_send(keypress(2));
        sender.try_send(keypress(3));

        let drained = queue.drain(8);
        let seqs: Vec<u32> = drained.iter().map(|k| k.seq_nr).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn full_queue_drops_and_reports_false() {
        let queue = InputQueue::with_capacity(2);
        let sender = queue.sender();
        assert!(sender.try_send(keypress(1)));
        assert!(sender.try_send(keypress(2)));
        assert!(!sender.try_send(keypress(3)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn drain_respects_limit() {
        let queue = InputQueue::with_capacity(8);
        let sender = queue.sender();
        for i in 0..5 {
            sender.try_send(keypress(i));
        }
        let drained = queue.drain(3);
        assert_eq!(drained.len(), 3);
        assert_eq!(queue.len(), 2);
    }
}
