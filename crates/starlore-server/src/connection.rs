//! Connection manager (spec §4.7, component C9), converted from the accept
//! loop and join/leave handling in `original_source/src/server/server.c`.
//!
//! The original drives a single `poll` loop over the listen socket and
//! every client socket. This reimplementation uses one thread per accepted
//! connection instead (each blocks in its own `recv`/`FrameReader` loop);
//! the spec's ordering and single-writer-per-socket guarantees (§5) are
//! preserved by `PacketWriter`'s per-socket mutex and by funnelling every
//! mutation of shared state through `PlayerTable`/`MessageLog`'s own locks.
//! This trades the literal `poll()` shape for the plainer thread-per-
//! connection idiom, which is the ordinary way to write this in Rust.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use std::time::Duration;

use rand::Rng;
use socket2::{Socket, TcpKeepalive};

use starlore_common::consts::{HISTORY_BATCH, MAX_TRANSFER, TCP_KEEPALIVE_SECS};
use starlore_common::framing::FrameReader;
use starlore_common::handshake;
use starlore_common::log::{log_error, log_info, log_warn};
use starlore_common::message::{Message, MessageLog};
use starlore_common::packet::{
    self, GameWorldInitBody, GameWorldObjectAddBody, MessageBody, MessageHistoryBody, PacketType, PlayerAddBody,
    PlayerInitBody, PlayerInitConfirmBody, PlayerKeypressBody, PlayerRemoveBody,
};
use starlore_common::player::Player;
use starlore_common::world::GameObject;
use starlore_common::{Error, PacketWriter, Result};

use crate::context::ServerContext;

/// Runs the accept loop forever; each accepted connection is handed to its
/// own thread. Returns only on a fatal listener error (spec §7: bind
/// failure propagates to a non-zero exit).
pub fn accept_loop(ctx: Arc<ServerContext>, listener: TcpListener) -> Result<()> {
    log_info(&format!("listening on {}", listener.local_addr().map_err(Error::from)?));
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let ctx = ctx.clone();
                thread::spawn(move || handle_connection(ctx, stream));
            }
            Err(e) => {
                log_warn(&format!("accept() error: {e}"));
            }
        }
    }
    Ok(())
}

fn handle_connection(ctx: Arc<ServerContext>, mut stream: TcpStream) {
    let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| "?".into());
    tune_socket(&stream, &peer);

    let accepted = match handshake::server_validate(&mut stream) {
        Ok(accepted) => accepted,
        Err(e) => {
            log_warn(&format!("handshake with {peer} failed: {e}"));
            return;
        }
    };
    if !accepted {
        log_info(&format!("{peer} failed the handshake puzzle, closing"));
        return;
    }

    if ctx.players.is_full() {
        log_info(&format!("{peer} rejected: server full"));
        return;
    }

    let writer = match stream.try_clone() {
        Ok(s) => Arc::new(PacketWriter::new(s)),
        Err(e) => {
            log_error(&format!("try_clone failed for {peer}: {e}"));
            return;
        }
    };

    let color = random_color();
    let id = match ctx.players.allocate(writer.clone(), color) {
        Ok(id) => id,
        Err(e) => {
            log_info(&format!("{peer} rejected: {e}"));
            return;
        }
    };

    // Speculative PlayerInit, sent before the confirm arrives (spec §4.7,
    // and the open question in spec §9 about gating the *join fan-out*
    // rather than this first send on the confirm).
    if let Some(init) = ctx.players.with_player(id, |p| PlayerInitBody {
        id: p.id,
        pos: [p.position.x, p.position.y],
        color: [p.color.0, p.color.1, p.color.2],
        health: p.health,
        state: p.state.to_wire(),
        direction: p.direction.to_wire(),
    }) {
        let _ = writer.send(&packet::encode(&init));
    }

    let mut reader = FrameReader::new();
    let name = match wait_for_confirm(&mut reader, &mut stream, id) {
        Ok(name) => name,
        Err(e) => {
            log_info(&format!("{peer} (id {id}) dropped before confirming join: {e}"));
            ctx.players.remove(id);
            return;
        }
    };

    let others_before_join = ctx.players.broadcast_targets();
    ctx.players.confirm_join(id, name.clone());
    log_info(&format!("{name} (id {id}) joined from {peer}"));

    send_join_sequence(&ctx, &writer, &others_before_join);

    let joined_message = Message::system(format!("{name} joined the game!"));
    broadcast_message(&ctx, &joined_message, Some(id));
    ctx.messages.lock().push(joined_message);

    broadcast_player_add(&ctx, id, &others_before_join);

    read_loop(&ctx, &mut reader, &mut stream, id);

    disconnect(&ctx, id, &name);
}

/// Blocks until the matching `PlayerInitConfirm` arrives, ignoring (and
/// logging) anything else received first — the connection completes the
/// join only once the name is present (spec §9 open question).
fn wait_for_confirm(reader: &mut FrameReader, stream: &mut TcpStream, id: u32) -> Result<String> {
    loop {
        let frames = reader.read_frames(stream)?;
        for frame in frames {
            if frame.packet_type == PacketType::PlayerInitConfirm {
                let body: PlayerInitConfirmBody = packet::decode(&frame.body)?;
                if body.id != id {
                    return Err(Error::Protocol("confirm for wrong id".into()));
                }
                return Ok(body.name);
            }
            log_warn(&format!("ignoring {:?} before join confirm for id {id}", frame.packet_type));
        }
    }
}

fn send_join_sequence(ctx: &ServerContext, writer: &PacketWriter, existing: &[(u32, Arc<PacketWriter>)]) {
    for &(other_id, _) in existing {
        if let Some(add) = ctx.players.with_player(other_id, |p| player_add_body(p)) {
            let _ = writer.send(&packet::encode(&add));
        }
    }

    let history = ctx.messages.lock();
    send_history_batches(&history, writer);
    drop(history);

    let init = GameWorldInitBody { seed: ctx.map.seed, octaves: ctx.map.octave_count, bias: ctx.map.bias_f32() };
    let _ = writer.send(&packet::encode(&init));

    send_world_objects(&ctx.world_objects, writer);
}

/// Sends `GameWorldObjectAdd` in batches of at most `MAX_TRANSFER` (spec
/// §3). The client identifies the last batch by `length < MAX_TRANSFER`, so
/// an exact multiple of `MAX_TRANSFER` gets one trailing empty batch to
/// keep that marker unambiguous — the same trick `send_history_batches`
/// uses for an empty history.
fn send_world_objects(objects: &[GameObject], writer: &PacketWriter) {
    let mut sent_full_batch = objects.is_empty();
    for chunk in objects.chunks(MAX_TRANSFER) {
        let body = GameWorldObjectAddBody { length: chunk.len() as u32, objects: chunk.to_vec() };
        let _ = writer.send(&packet::encode(&body));
        sent_full_batch = chunk.len() == MAX_TRANSFER;
    }
    if sent_full_batch {
        let body = GameWorldObjectAddBody { length: 0, objects: Vec::new() };
        let _ = writer.send(&packet::encode(&body));
    }
}

fn send_history_batches(history: &MessageLog, writer: &PacketWriter) {
    let mut any = false;
    for batch in history.batches(HISTORY_BATCH) {
        any = true;
        let bodies: Vec<MessageBody> = batch.iter().map(MessageBody::from_message).collect();
        let body = MessageHistoryBody { count: bodies.len() as u32, history: bodies };
        let _ = writer.send(&packet::encode(&body));
    }
    if !any {
        let body = MessageHistoryBody { count: 0, history: Vec::new() };
        let _ = writer.send(&packet::encode(&body));
    }
}

fn broadcast_player_add(ctx: &ServerContext, id: u32, targets: &[(u32, Arc<PacketWriter>)]) {
    let Some(add) = ctx.players.with_player(id, player_add_body) else { return };
    let bytes = packet::encode(&add);
    for (other_id, writer) in targets {
        if *other_id == id {
            continue;
        }
        let _ = writer.send(&bytes);
    }
}

fn player_add_body(p: &Player) -> PlayerAddBody {
    PlayerAddBody {
        id: p.id,
        name: p.name.clone(),
        pos: [p.position.x, p.position.y],
        color: [p.color.0, p.color.1, p.color.2],
        health: p.health,
        state: p.state.to_wire(),
        direction: p.direction.to_wire(),
    }
}

fn read_loop(ctx: &ServerContext, reader: &mut FrameReader, stream: &mut TcpStream, id: u32) {
    let sender = ctx.input_queue.sender();
    loop {
        let frames = match reader.read_frames(stream) {
            Ok(frames) => frames,
            Err(Error::Disconnected) => return,
            Err(e) => {
                log_warn(&format!("frame error on id {id}, dropping connection: {e}"));
                return;
            }
        };

        for frame in frames {
            match frame.packet_type {
                PacketType::PlayerKeypress => {
                    let body: PlayerKeypressBody = match packet::decode(&frame.body) {
                        Ok(b) => b,
                        Err(e) => {
                            log_warn(&format!("bad keypress body from id {id}: {e}"));
                            continue;
                        }
                    };
                    if !sender.try_send(body) {
                        log_warn(&format!("input queue full, dropping keypress from id {id}"));
                    }
                }
                PacketType::Message => {
                    let body: MessageBody = match packet::decode(&frame.body) {
                        Ok(b) => b,
                        Err(e) => {
                            log_warn(&format!("bad message body from id {id}: {e}"));
                            continue;
                        }
                    };
                    let name = ctx.players.with_player(id, |p| p.name.clone()).unwrap_or_default();
                    let message = Message::player(name, body.content, chrono_now());
                    broadcast_message(ctx, &message, None);
                    ctx.messages.lock().push(message);
                }
                PacketType::Ping => {
                    // Echoed verbatim (spec E1).
                    let bytes = packet::encode(&starlore_common::packet::PingBody {
                        time_ns: u64::from_le_bytes(frame.body[..8].try_into().unwrap_or_default()),
                    });
                    if let Some(writer) = ctx.players.writer(id) {
                        let _ = writer.send(&bytes);
                    }
                }
                PacketType::PlayerRemove => return,
                other => log_warn(&format!("unexpected packet type {other:?} from id {id}")),
            }
        }
    }
}

fn chrono_now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn disconnect(ctx: &ServerContext, id: u32, name: &str) {
    ctx.players.remove(id);
    let leave = Message::system(format!("{name} left the game."));
    broadcast_message(ctx, &leave, None);
    ctx.messages.lock().push(leave);
    broadcast_remove(ctx, id);
    log_info(&format!("{name} (id {id}) disconnected"));
}

fn broadcast_remove(ctx: &ServerContext, id: u32) {
    let bytes = packet::encode(&PlayerRemoveBody { id });
    for (_, writer) in ctx.players.broadcast_targets() {
        let _ = writer.send(&bytes);
    }
}

pub fn broadcast_message(ctx: &ServerContext, message: &Message, skip: Option<u32>) {
    let bytes = packet::encode(&MessageBody::from_message(message));
    for (other_id, writer) in ctx.players.broadcast_targets() {
        if Some(other_id) == skip {
            continue;
        }
        let _ = writer.send(&bytes);
    }
}

/// TCP_NODELAY plus keepalive on a freshly accepted socket (spec §1 ambient
/// stack). Best-effort: a platform that rejects one of these options still
/// gets a working, just less tuned, connection.
fn tune_socket(stream: &TcpStream, peer: &str) {
    if let Err(e) = stream.set_nodelay(true) {
        log_warn(&format!("set_nodelay failed for {peer}: {e}"));
    }
    let socket = Socket::from(stream.try_clone().expect("tune_socket: try_clone"));
    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(TCP_KEEPALIVE_SECS));
    if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
        log_warn(&format!("set_tcp_keepalive failed for {peer}: {e}"));
    }
    std::mem::forget(socket);
}

fn random_color() -> (f32, f32, f32) {
    let mut rng = rand::thread_rng();
    (rng.gen(), rng.gen(), rng.gen())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use starlore_common::world::GameMap;

    fn test_ctx() -> Arc<ServerContext> {
        ServerContext::new(GameMap::new(1, 1, 2.0))
    }

    fn join(ctx: &Arc<ServerContext>, addr: std::net::SocketAddr, name: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).unwrap();
        assert!(handshake::client_validate(&mut stream).unwrap());

        let mut reader = FrameReader::new();
        let init_frame = &reader.read_frames(&mut stream).unwrap()[0];
        let init: PlayerInitBody = packet::decode(&init_frame.body).unwrap();

        stream
            .write_all(&packet::encode(&PlayerInitConfirmBody { id: init.id, name: name.to_string() }))
            .unwrap();
        stream
    }

    /// E1: the server echoes a Ping packet byte-for-byte.
    #[test]
    fn e1_ping_echoes_byte_exact() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let ctx = test_ctx();

        let server_ctx = ctx.clone();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(server_ctx, stream);
        });

        let mut client = join(&ctx, addr, "pinger");
        let ping = starlore_common::packet::PingBody { time_ns: 1_234_567_890 };
        let ping_bytes = packet::encode(&ping);
        client.write_all(&ping_bytes).unwrap();

        let mut reader = FrameReader::new();
        loop {
            let frames = reader.read_frames(&mut client).unwrap();
            if let Some(f) = frames.iter().find(|f| f.packet_type == PacketType::Ping) {
                assert_eq!(f.body.as_slice(), &ping_bytes[starlore_common::packet::HEADER_SIZE..]);
                break;
            }
        }
    }

    /// E2: a new client receives PlayerAdd for each existing player (in
    /// join order) then MessageHistory, then GameWorldInit, then the
    /// GameWorldObjectAdd tail; existing clients receive PlayerAdd for the
    /// newcomer plus a join system message.
    #[test]
    fn e2_join_sequence_matches_order() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let ctx = test_ctx();

        let accept = |ctx: Arc<ServerContext>, listener: &TcpListener| {
            let (stream, _) = listener.accept().unwrap();
            thread::spawn(move || handle_connection(ctx, stream));
        };
        accept(ctx.clone(), &listener);
        let _p1 = join(&ctx, addr, "p1");
        // Wait until the server has actually confirmed p1's join before
        // connecting p2, so p2's PlayerAdd batch is guaranteed to include it.
        while ctx.players.broadcast_targets().is_empty() {
            thread::yield_now();
        }

        accept(ctx.clone(), &listener);
        let mut p2 = join(&ctx, addr, "p2");
        let mut p2_reader = FrameReader::new();

        let mut types = Vec::new();
        while types.len() < 4 {
            let frames = p2_reader.read_frames(&mut p2).unwrap();
            types.extend(frames.iter().map(|f| f.packet_type));
        }

        assert_eq!(types[0], PacketType::PlayerAdd);
        assert_eq!(types[1], PacketType::MessageHistory);
        assert_eq!(types[2], PacketType::GameWorldInit);
        assert_eq!(types[3], PacketType::GameWorldObjectAdd);
    }
}
