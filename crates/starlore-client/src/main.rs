//! StarLore client entry point (spec §6.2), converted from the connect/main
//! loop in `original_source/src/client/client.c`'s own `main`.
//!
//! The actual window, renderer, and raw keyboard/mouse glue are external
//! collaborators this crate doesn't own (spec §3) — they'd register
//! `InputSource` callbacks on the event bus and call `WorldRenderer::
//! render_visible` against `ClientState` each frame. What's here is the
//! console-driven half: connect, run the network thread, and expose the
//! `/ping` and `/quit` stdin affordances spec §9 calls out as the only
//! human-readable parsing the client needs.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use starlore_client::event_bus::EventBus;
use starlore_client::network;
use starlore_common::log::{log_fatal, log_info, log_warn};
use starlore_common::player::InputKey;

/// The CLI takes only a username (spec §6.2); the server address isn't a
/// spec'd argument, so a fixed loopback default stands in for the
/// connection menu a real client UI would offer.
const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:27910";

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <username>", args.first().map(String::as_str).unwrap_or("starlore-client"));
        std::process::exit(1);
    }
    let username = &args[1];

    let bus = Arc::new(EventBus::new());
    let (client, reader, stream, leftover) = match network::connect(DEFAULT_SERVER_ADDR, username, bus.clone()) {
        Ok(parts) => parts,
        Err(e) => log_fatal(&format!("connect failed: {e}")),
    };
    let client = Arc::new(client);

    let net_client = client.clone();
    thread::spawn(move || {
        if let Err(e) = network::run(&net_client, reader, stream, leftover) {
            log_warn(&format!("network thread exiting: {e}"));
        }
    });

    log_info("connected. type to chat, /ping to measure round trip, /quit to leave.");
    run_console(&client, &bus);
}

/// Reads stdin lines until `/quit` or EOF, dispatching the two recognized
/// commands and forwarding everything else as a chat message (spec §9).
fn run_console(client: &network::NetworkClient, bus: &EventBus) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log_warn(&format!("stdin read error: {e}"));
                break;
            }
        };

        bus.poll();

        match line.trim() {
            "/quit" => {
                let _ = client.quit();
                break;
            }
            "/ping" => {
                let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0) as u64;
                if let Err(e) = client.send_ping(now) {
                    log_warn(&format!("ping send failed: {e}"));
                }
            }
            "" => {}
            content => {
                if let Err(e) = client.send_message(content) {
                    log_warn(&format!("message send failed: {e}"));
                }
            }
        }
    }
}

/// Forwards a raw key press to both local prediction and the wire (spec
/// §4.8). Kept as a free function so a real `InputSource` can call it
/// directly once window/keyboard glue exists.
#[allow(dead_code)]
fn on_key_pressed(client: &network::NetworkClient, key: InputKey) {
    if let Err(e) = client.send_keypress(key) {
        log_warn(&format!("keypress send failed: {e}"));
    }
}
