//! Client network thread (spec §4.7/§5), converted from the connect/join
//! sequence and receive loop in `original_source/src/client/client.c`.
//!
//! Owns the socket's read half and the frame reader; the write half is
//! shared via `PacketWriter` so the main/render thread can send keypresses
//! and chat without taking this thread's lock. Everything this thread
//! learns about the world (`GameWorldInit`, remote joins) is handed to the
//! render thread only through `ClientState` (guarded by a `parking_lot`
//! mutex) and the event bus (spec §5: "the event bus is the only
//! sanctioned cross-thread handoff").

use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use socket2::{Socket, TcpKeepalive};

use starlore_common::consts::{MAX_TRANSFER, PLAYER_MAX_NAME_LENGTH, TCP_KEEPALIVE_SECS};
use starlore_common::framing::{Frame, FrameReader};
use starlore_common::handshake;
use starlore_common::log::{log_info, log_warn};
use starlore_common::math::Vec2;
use starlore_common::packet::{
    self, GameWorldObjectAddBody, MessageBody, MessageHistoryBody, PacketType, PingBody, PlayerAddBody,
    PlayerDeathBody, PlayerHealthBody, PlayerInitBody, PlayerInitConfirmBody, PlayerKeypressBody, PlayerRemoveBody,
    PlayerRespawnBody, PlayerUpdateBody,
};
use starlore_common::player::{Direction, InputKey, PlayerId, PlayerState};
use starlore_common::world::{GameMap, GameObject};
use starlore_common::{Error, PacketWriter, Result};

use crate::chat::ClientChat;
use crate::event_bus::{EventBus, EventCode, EventData};
use crate::interpolation::RemotePlayer;
use crate::prediction::LocalPlayer;

/// Everything the render thread needs, kept behind one lock so a frame's
/// worth of reads sees a consistent snapshot.
pub struct ClientState {
    pub local: LocalPlayer,
    pub remotes: HashMap<PlayerId, RemotePlayer>,
    pub chat: ClientChat,
    pub map: Option<GameMap>,
    pub objects: Vec<GameObject>,
}

impl ClientState {
    fn new(local: LocalPlayer) -> Self {
        ClientState { local, remotes: HashMap::new(), chat: ClientChat::new(), map: None, objects: Vec::new() }
    }
}

pub struct NetworkClient {
    writer: Arc<PacketWriter>,
    pub state: Arc<Mutex<ClientState>>,
    pub bus: Arc<EventBus>,
    local_id: PlayerId,
}

/// Connects, runs the handshake, and consumes the full join sequence (spec
/// §4.7: own `PlayerInit`, existing players' `PlayerAdd`, `MessageHistory`
/// batches, `GameWorldInit`, `GameWorldObjectAdd` batches). Returns the
/// client plus the still-open reader/stream for `run` to take over, along
/// with any live-traffic frames that arrived coalesced with the tail of
/// the join sequence in the same read.
pub fn connect(
    addr: &str,
    username: &str,
    bus: Arc<EventBus>,
) -> Result<(NetworkClient, FrameReader, TcpStream, Vec<Frame>)> {
    let mut stream = TcpStream::connect(addr).map_err(Error::from)?;
    tune_socket(&stream);

    if !handshake::client_validate(&mut stream)? {
        return Err(Error::Protocol("server rejected handshake".into()));
    }

    let mut reader = FrameReader::new();

    let init = read_one::<PlayerInitBody>(&mut reader, &mut stream, PacketType::PlayerInit)?;
    let local_id = init.id;
    let local = LocalPlayer::new(
        local_id,
        Vec2::new(init.pos[0], init.pos[1]),
        (init.color[0], init.color[1], init.color[2]),
    );

    let mut name = username.to_string();
    name.truncate(PLAYER_MAX_NAME_LENGTH);
    let writer = Arc::new(PacketWriter::new(stream.try_clone().map_err(Error::from)?));
    writer.send(&packet::encode(&PlayerInitConfirmBody { id: local_id, name: name.clone() }))?;

    let state = Arc::new(Mutex::new(ClientState::new(local)));
    let leftover = consume_join_sequence(&state, &mut reader, &mut stream, local_id)?;

    bus.fire(EventCode::PlayerInit, EventData::None);
    bus.fire(EventCode::GameWorldInit, EventData::None);
    log_info(&format!("joined as {name} (id {local_id})"));

    Ok((NetworkClient { writer, state, bus, local_id }, reader, stream, leftover))
}

/// TCP_NODELAY plus keepalive on the connect socket (spec §1 ambient
/// stack, following the server's own `tune_socket`). Best-effort.
fn tune_socket(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        log_warn(&format!("set_nodelay failed: {e}"));
    }
    let socket = Socket::from(stream.try_clone().expect("tune_socket: try_clone"));
    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(TCP_KEEPALIVE_SECS));
    if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
        log_warn(&format!("set_tcp_keepalive failed: {e}"));
    }
    std::mem::forget(socket);
}

/// Reads frames until one of type `expected` arrives, decoding it. Anything
/// else before it is logged and dropped — mirrors the server's
/// `wait_for_confirm` tolerance for out-of-order noise.
fn read_one<T: packet::WireBody>(
    reader: &mut FrameReader,
    stream: &mut TcpStream,
    expected: PacketType,
) -> Result<T> {
    loop {
        let frames = reader.read_frames(stream)?;
        for frame in frames {
            if frame.packet_type == expected {
                return packet::decode(&frame.body);
            }
            log_warn(&format!("ignoring {:?} while awaiting {:?}", frame.packet_type, expected));
        }
    }
}

/// Consumes `PlayerAdd`/`MessageHistory` until `GameWorldInit`, then the
/// `GameWorldObjectAdd` batches that follow it (spec §4.7). The last batch
/// is identified by `length < MAX_TRANSFER` (mirroring how `MessageHistory`
/// uses its own `count` field rather than a separate terminator packet).
/// Any frames read past that point in the same coalesced read are handed
/// back to the caller rather than dropped, since a `FrameReader` can't be
/// rewound once a frame has been decoded out of it.
fn consume_join_sequence(
    state: &Arc<Mutex<ClientState>>,
    reader: &mut FrameReader,
    stream: &mut TcpStream,
    local_id: PlayerId,
) -> Result<Vec<Frame>> {
    loop {
        let frames = reader.read_frames(stream)?;
        for (i, frame) in frames.iter().enumerate() {
            match frame.packet_type {
                PacketType::PlayerAdd => {
                    let body: PlayerAddBody = packet::decode(&frame.body)?;
                    add_remote(state, &body, local_id);
                }
                PacketType::MessageHistory => {
                    let body: MessageHistoryBody = packet::decode(&frame.body)?;
                    state.lock().chat.ingest_history(&body);
                }
                PacketType::GameWorldInit => {
                    let body: packet::GameWorldInitBody = packet::decode(&frame.body)?;
                    state.lock().map = Some(GameMap::new(body.seed, body.octaves, body.bias));
                    return consume_world_objects(state, reader, stream, frames[i + 1..].to_vec());
                }
                other => {
                    log_warn(&format!("unexpected join-sequence packet {other:?} before GameWorldInit"));
                }
            }
        }
    }
}

/// Continues the join sequence's `GameWorldObjectAdd` tail. `carry` is any
/// frames from the batch that contained `GameWorldInit` but weren't yet
/// consumed.
fn consume_world_objects(
    state: &Arc<Mutex<ClientState>>,
    reader: &mut FrameReader,
    stream: &mut TcpStream,
    mut carry: Vec<Frame>,
) -> Result<Vec<Frame>> {
    loop {
        let batch = if carry.is_empty() { reader.read_frames(stream)? } else { std::mem::take(&mut carry) };
        for (i, frame) in batch.iter().enumerate() {
            if frame.packet_type != PacketType::GameWorldObjectAdd {
                // Join sequence has no explicit terminator beyond the
                // length marker; treat the first non-matching packet as
                // the start of ordinary live traffic.
                return Ok(batch[i..].to_vec());
            }
            let body: GameWorldObjectAddBody = packet::decode(&frame.body)?;
            let done = body.length < MAX_TRANSFER as u32;
            state.lock().objects.extend(body.objects);
            if done {
                return Ok(batch[i + 1..].to_vec());
            }
        }
    }
}

fn add_remote(state: &Arc<Mutex<ClientState>>, body: &PlayerAddBody, local_id: PlayerId) {
    if body.id == local_id {
        return;
    }
    let mut state = state.lock();
    let mut remote = RemotePlayer::new(
        body.id,
        Vec2::new(body.pos[0], body.pos[1]),
        (body.color[0], body.color[1], body.color[2]),
    );
    remote.player.name = body.name.clone();
    remote.player.health = body.health;
    if let Some(d) = Direction::from_wire(body.direction) {
        remote.player.direction = d;
    }
    if let Some(s) = PlayerState::from_wire(body.state) {
        remote.player.state = s;
    }
    state.remotes.insert(body.id, remote);
}

/// Runs the blocking receive loop forever; returns once the connection
/// drops (spec §7: the client treats any server disconnect as fatal to the
/// session). `leftover` is dispatched first (frames `connect` already
/// decoded past the end of the join sequence).
pub fn run(client: &NetworkClient, mut reader: FrameReader, mut stream: TcpStream, leftover: Vec<Frame>) -> Result<()> {
    for frame in leftover {
        dispatch(&client.state, frame.packet_type, &frame.body, client.local_id)?;
    }
    loop {
        let frames = reader.read_frames(&mut stream)?;
        for frame in frames {
            dispatch(&client.state, frame.packet_type, &frame.body, client.local_id)?;
        }
    }
}

fn dispatch(state: &Arc<Mutex<ClientState>>, packet_type: PacketType, body: &[u8], local_id: PlayerId) -> Result<()> {
    match packet_type {
        PacketType::PlayerAdd => {
            let add: PlayerAddBody = packet::decode(body)?;
            add_remote(state, &add, local_id);
        }
        PacketType::PlayerRemove => {
            let remove: PlayerRemoveBody = packet::decode(body)?;
            state.lock().remotes.remove(&remove.id);
        }
        PacketType::PlayerUpdate => {
            let update: PlayerUpdateBody = packet::decode(body)?;
            let mut state = state.lock();
            if update.id == local_id {
                state.local.reconcile(&update);
            } else if let Some(remote) = state.remotes.get_mut(&update.id) {
                remote.apply_snapshot(&update);
            }
        }
        PacketType::PlayerHealth => {
            let health: PlayerHealthBody = packet::decode(body)?;
            let mut state = state.lock();
            if health.id == local_id {
                state.local.player.health -= health.damage as i32;
            } else if let Some(remote) = state.remotes.get_mut(&health.id) {
                remote.player.health -= health.damage as i32;
            }
        }
        PacketType::PlayerDeath => {
            let death: PlayerDeathBody = packet::decode(body)?;
            let mut state = state.lock();
            if death.id == local_id {
                state.local.player.state = PlayerState::Dead;
            } else if let Some(remote) = state.remotes.get_mut(&death.id) {
                remote.player.state = PlayerState::Dead;
            }
        }
        PacketType::PlayerRespawn => {
            let respawn: PlayerRespawnBody = packet::decode(body)?;
            apply_respawn(state, &respawn, local_id);
        }
        PacketType::Message => {
            let message: MessageBody = packet::decode(body)?;
            state.lock().chat.ingest_message(&message);
        }
        PacketType::Ping => {
            let ping: PingBody = packet::decode(body)?;
            log_info(&format!("pong: {} ns round trip start", ping.time_ns));
        }
        PacketType::GameWorldObjectAdd => {
            let objects: GameWorldObjectAddBody = packet::decode(body)?;
            state.lock().objects.extend(objects.objects);
        }
        other => {
            log_warn(&format!("unhandled live packet type {other:?}"));
        }
    }
    Ok(())
}

fn apply_respawn(state: &Arc<Mutex<ClientState>>, respawn: &PlayerRespawnBody, local_id: PlayerId) {
    let mut state = state.lock();
    let pos = Vec2::new(respawn.pos[0], respawn.pos[1]);
    let direction = Direction::from_wire(respawn.direction).unwrap_or(Direction::Down);
    let player_state = PlayerState::from_wire(respawn.state).unwrap_or(PlayerState::Idle);
    if respawn.id == local_id {
        state.local.player.position = pos;
        state.local.player.health = respawn.health;
        state.local.player.direction = direction;
        state.local.player.state = player_state;
    } else if let Some(remote) = state.remotes.get_mut(&respawn.id) {
        remote.player.position = pos;
        remote.player.health = respawn.health;
        remote.player.direction = direction;
        remote.player.state = player_state;
    }
}

impl NetworkClient {
    /// Applies `key` locally (spec §4.8) and forwards the same input to the
    /// server. Only fires on press: movement is one discrete step per call,
    /// driven by the caller's own fixed-tick loop for keys held down, so
    /// "release" needs no separate wire message.
    pub fn send_keypress(&self, key: InputKey) -> Result<()> {
        let seq = packet::next_sequence();
        let applied = {
            let mut state = self.state.lock();
            state.local.apply_local(seq, key)
        };
        if !applied {
            return Ok(());
        }
        let body = PlayerKeypressBody { id: self.local_id, seq_nr: seq, key: key.to_wire(), mods: 0, action: 1 };
        self.writer.send(&packet::encode(&body))
    }

    pub fn send_message(&self, content: impl Into<String>) -> Result<()> {
        let body = MessageBody {
            kind: starlore_common::message::MessageType::Player.to_wire(),
            timestamp: 0,
            author: String::new(),
            content: content.into(),
        };
        self.writer.send(&packet::encode(&body))
    }

    pub fn send_ping(&self, time_ns: u64) -> Result<()> {
        self.writer.send(&packet::encode(&PingBody { time_ns }))
    }

    pub fn quit(&self) -> Result<()> {
        self.writer.send(&packet::encode(&PlayerRemoveBody { id: self.local_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn spawn_server(port_tx: std::sync::mpsc::Sender<u16>) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            port_tx.send(listener.local_addr().unwrap().port()).unwrap();
            let (mut socket, _) = listener.accept().unwrap();

            handshake::server_validate(&mut socket).unwrap();

            let init = PlayerInitBody {
                id: 1000,
                pos: [0.0, 0.0],
                color: [1.0, 0.0, 0.0],
                health: 200,
                state: 0,
                direction: 0,
            };
            std::io::Write::write_all(&mut socket, &packet::encode(&init)).unwrap();

            let mut reader = FrameReader::new();
            let frames = reader.read_frames(&mut socket).unwrap();
            assert_eq!(frames[0].packet_type, PacketType::PlayerInitConfirm);

            let history = MessageHistoryBody { count: 0, history: Vec::new() };
            std::io::Write::write_all(&mut socket, &packet::encode(&history)).unwrap();

            let world_init = packet::GameWorldInitBody { seed: 7, octaves: 3, bias: 2.0 };
            std::io::Write::write_all(&mut socket, &packet::encode(&world_init)).unwrap();

            let objects = GameWorldObjectAddBody { length: 0, objects: Vec::new() };
            std::io::Write::write_all(&mut socket, &packet::encode(&objects)).unwrap();
        })
    }

    #[test]
    fn connect_consumes_join_sequence_and_exposes_local_player() {
        let (tx, rx) = std::sync::mpsc::channel();
        let server = spawn_server(tx);
        let port = rx.recv().unwrap();

        let bus = Arc::new(EventBus::new());
        let (client, _reader, _stream, leftover) =
            connect(&format!("127.0.0.1:{port}"), "alice", bus).expect("connect should succeed");

        assert!(leftover.is_empty());
        assert_eq!(client.local_id, 1000);
        let state = client.state.lock();
        assert_eq!(state.local.player.id, 1000);
        assert!(state.map.is_some());

        server.join().unwrap();
    }
}
