//! Process-wide event bus (spec §4.5, component C6), converted from
//! `original_source/src/client/event.c`/`event.h`. Per the redesign note in
//! spec §9, this is the one piece of global state the rewrite keeps
//! process-wide rather than folding into a context object — it is exactly
//! the cross-thread handoff the network thread and the render thread are
//! required to use (spec §5).

use std::collections::VecDeque;

use parking_lot::Mutex;

use starlore_common::consts::{EVENT_QUEUE_CAPACITY, MAX_POLL_EVENTS};
use starlore_common::log::log_warn;

/// Closed set of event codes (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCode {
    KeyPressed,
    KeyReleased,
    KeyRepeated,
    CharPressed,
    MouseButtonPressed,
    MouseButtonReleased,
    MouseMoved,
    MouseScrolled,
    WindowClosed,
    WindowResized,
    WindowMinimized,
    WindowMaximized,
    PlayerInit,
    GameWorldInit,
    ChunkReceived,
}

/// Event payload. The original carries a raw 16-byte union; an enum with
/// one variant per shape is the same budget without the alignment hazard
/// spec §9 warns about for packet bodies.
#[derive(Debug, Clone, Copy)]
pub enum EventData {
    Key { code: u32, mods: u32 },
    Char { codepoint: u32 },
    MouseButton { button: u32, mods: u32 },
    MousePos { x: f32, y: f32 },
    MouseScroll { dx: f32, dy: f32 },
    WindowSize { width: u32, height: u32 },
    ChunkCoord { x: i32, y: i32 },
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub code: EventCode,
    pub data: EventData,
}

/// A registered callback returns `true` to mean "handled, stop dispatch"
/// (spec §4.5), mirroring the original's early-return-on-handled loop.
pub type Callback = Box<dyn FnMut(&Event) -> bool + Send>;

/// Bounded FIFO plus a per-code ordered callback table (spec §4.5).
/// `fire` is callable from any thread; `poll`/`dispatch` are meant to run
/// only on the main thread, matching the original's single dispatch point.
pub struct EventBus {
    queue: Mutex<VecDeque<Event>>,
    callbacks: Mutex<std::collections::HashMap<EventCode, Vec<Callback>>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus { queue: Mutex::new(VecDeque::new()), callbacks: Mutex::new(std::collections::HashMap::new()) }
    }

    /// Enqueues an event. Never blocks: on a full queue the event is
    /// logged and dropped (spec §4.5 back-pressure).
    pub fn fire(&self, code: EventCode, data: EventData) -> bool {
        let mut queue = self.queue.lock();
        if queue.len() >= EVENT_QUEUE_CAPACITY {
            log_warn(&format!("event queue full, dropping {code:?}"));
            return false;
        }
        queue.push_back(Event { code, data });
        true
    }

    /// Registers `callback` for `code`, appended after any existing
    /// callbacks for that code (registration order, spec §4.5).
    pub fn register(&self, code: EventCode, callback: Callback) {
        self.callbacks.lock().entry(code).or_default().push(callback);
    }

    /// Drains at most `MAX_POLL_EVENTS` events and dispatches each to its
    /// code's callbacks in registration order, stopping at the first
    /// callback that returns `true`.
    pub fn poll(&self) {
        let mut drained = Vec::new();
        {
            let mut queue = self.queue.lock();
            for _ in 0..MAX_POLL_EVENTS {
                match queue.pop_front() {
                    Some(event) => drained.push(event),
                    None => break,
                }
            }
        }

        let mut callbacks = self.callbacks.lock();
        for event in drained {
            if let Some(handlers) = callbacks.get_mut(&event.code) {
                for handler in handlers.iter_mut() {
                    if handler(&event) {
                        break;
                    }
                }
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn fire_and_poll_dispatches_in_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        bus.register(
            EventCode::KeyPressed,
            Box::new(move |_| {
                o1.lock().push(1);
                false
            }),
        );
        let o2 = order.clone();
        bus.register(
            EventCode::KeyPressed,
            Box::new(move |_| {
                o2.lock().push(2);
                true
            }),
        );
        let o3 = order.clone();
        bus.register(
            EventCode::KeyPressed,
            Box::new(move |_| {
                o3.lock().push(3);
                false
            }),
        );

        bus.fire(EventCode::KeyPressed, EventData::Key { code: 1, mods: 0 });
        bus.poll();

        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn full_queue_drops_and_reports_false() {
        let bus = EventBus::new();
        for _ in 0..EVENT_QUEUE_CAPACITY {
            assert!(bus.fire(EventCode::WindowResized, EventData::None));
        }
        assert!(!bus.fire(EventCode::WindowResized, EventData::None));
    }

    #[test]
    fn poll_drains_at_most_max_poll_events() {
        let bus = EventBus::new();
        for _ in 0..(MAX_POLL_EVENTS + 10) {
            bus.fire(EventCode::MouseMoved, EventData::None);
        }
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.register(
            EventCode::MouseMoved,
            Box::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                false
            }),
        );
        bus.poll();
        assert_eq!(count.load(Ordering::SeqCst), MAX_POLL_EVENTS);
        assert_eq!(bus.pending(), 10);
    }
}
