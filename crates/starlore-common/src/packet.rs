//! Packet codec (spec §4.1/§6.1, component C1), converted from
//! `original_source/src/common/packet.{h,c}`. Every type on the wire is an
//! 8-byte little-endian header (`type: u32`, `size: u32`) followed by a
//! fixed-size body; unlike the C original's `memcpy`-a-struct-pointer
//! approach (flagged as a hazard in spec §9), every field here is read and
//! written at an explicit offset so there is no reliance on host endianness
//! or struct layout.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::consts::{HISTORY_BATCH, MAX_TRANSFER, MESSAGE_MAX_CONTENT_LENGTH, PLAYER_MAX_NAME_LENGTH};
use crate::error::{Error, Result};
use crate::message::{Message, MessageType};
use crate::world::{GameObject, GameObjectType};

pub const HEADER_SIZE: usize = 8;

/// Closed set of packet types, stable numeric IDs starting at 0 (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    None = 0,
    Header = 1,
    Ping = 2,
    Message = 3,
    MessageHistory = 4,
    PlayerInit = 5,
    PlayerInitConfirm = 6,
    PlayerAdd = 7,
    PlayerRemove = 8,
    PlayerUpdate = 9,
    PlayerHealth = 10,
    PlayerDeath = 11,
    PlayerRespawn = 12,
    PlayerKeypress = 13,
    GameWorldInit = 14,
    GameWorldObjectAdd = 15,
}

pub const PACKET_TYPE_COUNT: u32 = 16;

impl PacketType {
    pub fn from_wire(v: u32) -> Option<PacketType> {
        use PacketType::*;
        match v {
            0 => Some(None),
            1 => Some(Header),
            2 => Some(Ping),
            3 => Some(Message),
            4 => Some(MessageHistory),
            5 => Some(PlayerInit),
            6 => Some(PlayerInitConfirm),
            7 => Some(PlayerAdd),
            8 => Some(PlayerRemove),
            9 => Some(PlayerUpdate),
            10 => Some(PlayerHealth),
            11 => Some(PlayerDeath),
            12 => Some(PlayerRespawn),
            13 => Some(PlayerKeypress),
            14 => Some(GameWorldInit),
            15 => Some(GameWorldObjectAdd),
            _ => None,
        }
    }

    /// Fixed body size for this type, converted from `PACKET_TYPE_SIZE` in
    /// `original_source/src/common/packet.h`.
    pub fn size_of(self) -> u32 {
        use PacketType::*;
        match self {
            None => 0,
            Header => HEADER_SIZE as u32,
            Ping => PingBody::SIZE as u32,
            Message => MessageBody::SIZE as u32,
            MessageHistory => MessageHistoryBody::SIZE as u32,
            PlayerInit => PlayerInitBody::SIZE as u32,
            PlayerInitConfirm => PlayerInitConfirmBody::SIZE as u32,
            PlayerAdd => PlayerAddBody::SIZE as u32,
            PlayerRemove => PlayerRemoveBody::SIZE as u32,
            PlayerUpdate => PlayerUpdateBody::SIZE as u32,
            PlayerHealth => PlayerHealthBody::SIZE as u32,
            PlayerDeath => PlayerDeathBody::SIZE as u32,
            PlayerRespawn => PlayerRespawnBody::SIZE as u32,
            PlayerKeypress => PlayerKeypressBody::SIZE as u32,
            GameWorldInit => GameWorldInitBody::SIZE as u32,
            GameWorldObjectAdd => GameWorldObjectAddBody::SIZE as u32,
        }
    }
}

pub fn size_of(t: PacketType) -> u32 {
    t.size_of()
}

/// Global monotonic sequence counter (spec §3/§9). The original keeps a
/// `u64`; we keep a `u32` since the wire field is `u32` and a single
/// session never approaches 4 billion inputs (spec §9, open question).
static SEQUENCE: AtomicU32 = AtomicU32::new(0);

pub fn next_sequence() -> u32 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub packet_type: u32,
    pub size: u32,
}

impl Header {
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.packet_type.to_le_bytes());
        buf.extend_from_slice(&self.size.to_le_bytes());
    }

    pub fn read(bytes: &[u8]) -> Result<Header> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Protocol("short header".into()));
        }
        let packet_type = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let size = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        Ok(Header { packet_type, size })
    }
}

/// A fixed-size packet body that can be written to / read from the wire.
pub trait WireBody: Sized {
    const TYPE: PacketType;
    const SIZE: usize;

    fn write_body(&self, buf: &mut Vec<u8>);
    fn read_body(bytes: &[u8]) -> Result<Self>;
}

/// `encode(type, body) -> bytes` (spec §4.1): header plus body, total length
/// `size_of(type) + 8` (invariant P1).
pub fn encode<T: WireBody>(body: &T) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + T::SIZE);
    Header {
        packet_type: T::TYPE as u32,
        size: T::SIZE as u32,
    }
    .write(&mut buf);
    body.write_body(&mut buf);
    debug_assert_eq!(buf.len(), HEADER_SIZE + T::SIZE);
    buf
}

/// `decode(type, bytes) -> body` (spec §4.1). `bytes` is the body only (the
/// header is stripped by the framing reader before this is called). A
/// length mismatch against the type's fixed size is a fatal frame error for
/// the connection (spec §4.1).
pub fn decode<T: WireBody>(bytes: &[u8]) -> Result<T> {
    if bytes.len() != T::SIZE {
        return Err(Error::Protocol(format!(
            "size mismatch decoding type: expected {}, got {}",
            T::SIZE,
            bytes.len()
        )));
    }
    T::read_body(bytes)
}

// ---------------------------------------------------------------------------
// Primitive field helpers
// ---------------------------------------------------------------------------

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_i64(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_f32(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}
fn put_fixed_str(buf: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (width - n), 0);
}

fn get_u32(bytes: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap())
}
fn get_i32(bytes: &[u8], off: usize) -> i32 {
    i32::from_le_bytes(bytes[off..off + 4].try_into().unwrap())
}
fn get_u64(bytes: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(bytes[off..off + 8].try_into().unwrap())
}
fn get_i64(bytes: &[u8], off: usize) -> i64 {
    i64::from_le_bytes(bytes[off..off + 8].try_into().unwrap())
}
fn get_f32(bytes: &[u8], off: usize) -> f32 {
    f32::from_le_bytes(bytes[off..off + 4].try_into().unwrap())
}
fn get_fixed_str(bytes: &[u8], off: usize, width: usize) -> String {
    let slice = &bytes[off..off + width];
    let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
    String::from_utf8_lossy(&slice[..end]).into_owned()
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingBody {
    pub time_ns: u64,
}

impl WireBody for PingBody {
    const TYPE: PacketType = PacketType::Ping;
    const SIZE: usize = 8;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u64(buf, self.time_ns);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(PingBody { time_ns: get_u64(bytes, 0) })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageBody {
    pub kind: u32,
    pub timestamp: i64,
    pub author: String,
    pub content: String,
}

impl MessageBody {
    pub const SIZE: usize = 4 + 8 + PLAYER_MAX_NAME_LENGTH + MESSAGE_MAX_CONTENT_LENGTH;

    pub fn from_message(m: &Message) -> MessageBody {
        MessageBody {
            kind: m.kind.to_wire(),
            timestamp: m.timestamp,
            author: m.author.clone(),
            content: m.content.clone(),
        }
    }

    pub fn to_message(&self) -> Result<Message> {
        let kind = MessageType::from_wire(self.kind)
            .ok_or_else(|| Error::Protocol(format!("unknown message kind {}", self.kind)))?;
        Ok(Message {
            kind,
            timestamp: self.timestamp,
            author: self.author.clone(),
            content: self.content.clone(),
        })
    }
}

impl WireBody for MessageBody {
    const TYPE: PacketType = PacketType::Message;
    const SIZE: usize = MessageBody::SIZE;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.kind);
        put_i64(buf, self.timestamp);
        put_fixed_str(buf, &self.author, PLAYER_MAX_NAME_LENGTH);
        put_fixed_str(buf, &self.content, MESSAGE_MAX_CONTENT_LENGTH);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(MessageBody {
            kind: get_u32(bytes, 0),
            timestamp: get_i64(bytes, 4),
            author: get_fixed_str(bytes, 12, PLAYER_MAX_NAME_LENGTH),
            content: get_fixed_str(bytes, 12 + PLAYER_MAX_NAME_LENGTH, MESSAGE_MAX_CONTENT_LENGTH),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageHistoryBody {
    pub count: u32,
    pub history: Vec<MessageBody>,
}

impl MessageHistoryBody {
    pub const SIZE: usize = 4 + HISTORY_BATCH * MessageBody::SIZE;
}

impl WireBody for MessageHistoryBody {
    const TYPE: PacketType = PacketType::MessageHistory;
    const SIZE: usize = MessageHistoryBody::SIZE;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.count);
        for i in 0..HISTORY_BATCH {
            if let Some(m) = self.history.get(i) {
                m.write_body(buf);
            } else {
                buf.resize(buf.len() + MessageBody::SIZE, 0);
            }
        }
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        let count = get_u32(bytes, 0);
        let mut history = Vec::new();
        for i in 0..HISTORY_BATCH {
            let off = 4 + i * MessageBody::SIZE;
            if (i as u32) < count {
                history.push(MessageBody::read_body(&bytes[off..off + MessageBody::SIZE])?);
            }
        }
        Ok(MessageHistoryBody { count, history })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerInitBody {
    pub id: u32,
    pub pos: [f32; 2],
    pub color: [f32; 3],
    pub health: i32,
    pub state: u32,
    pub direction: u32,
}

impl WireBody for PlayerInitBody {
    const TYPE: PacketType = PacketType::PlayerInit;
    const SIZE: usize = 4 + 8 + 12 + 4 + 4 + 4;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.id);
        put_f32(buf, self.pos[0]);
        put_f32(buf, self.pos[1]);
        put_f32(buf, self.color[0]);
        put_f32(buf, self.color[1]);
        put_f32(buf, self.color[2]);
        put_i32(buf, self.health);
        put_u32(buf, self.state);
        put_u32(buf, self.direction);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(PlayerInitBody {
            id: get_u32(bytes, 0),
            pos: [get_f32(bytes, 4), get_f32(bytes, 8)],
            color: [get_f32(bytes, 12), get_f32(bytes, 16), get_f32(bytes, 20)],
            health: get_i32(bytes, 24),
            state: get_u32(bytes, 28),
            direction: get_u32(bytes, 32),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInitConfirmBody {
    pub id: u32,
    pub name: String,
}

impl WireBody for PlayerInitConfirmBody {
    const TYPE: PacketType = PacketType::PlayerInitConfirm;
    const SIZE: usize = 4 + PLAYER_MAX_NAME_LENGTH;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.id);
        put_fixed_str(buf, &self.name, PLAYER_MAX_NAME_LENGTH);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(PlayerInitConfirmBody {
            id: get_u32(bytes, 0),
            name: get_fixed_str(bytes, 4, PLAYER_MAX_NAME_LENGTH),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAddBody {
    pub id: u32,
    pub name: String,
    pub pos: [f32; 2],
    pub color: [f32; 3],
    pub health: i32,
    pub state: u32,
    pub direction: u32,
}

impl WireBody for PlayerAddBody {
    const TYPE: PacketType = PacketType::PlayerAdd;
    const SIZE: usize = 4 + PLAYER_MAX_NAME_LENGTH + 8 + 12 + 4 + 4 + 4;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.id);
        put_fixed_str(buf, &self.name, PLAYER_MAX_NAME_LENGTH);
        put_f32(buf, self.pos[0]);
        put_f32(buf, self.pos[1]);
        put_f32(buf, self.color[0]);
        put_f32(buf, self.color[1]);
        put_f32(buf, self.color[2]);
        put_i32(buf, self.health);
        put_u32(buf, self.state);
        put_u32(buf, self.direction);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        let mut off = 0usize;
        let id = get_u32(bytes, off);
        off += 4;
        let name = get_fixed_str(bytes, off, PLAYER_MAX_NAME_LENGTH);
        off += PLAYER_MAX_NAME_LENGTH;
        let pos = [get_f32(bytes, off), get_f32(bytes, off + 4)];
        off += 8;
        let color = [get_f32(bytes, off), get_f32(bytes, off + 4), get_f32(bytes, off + 8)];
        off += 12;
        let health = get_i32(bytes, off);
        off += 4;
        let state = get_u32(bytes, off);
        off += 4;
        let direction = get_u32(bytes, off);
        Ok(PlayerAddBody { id, name, pos, color, health, state, direction })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerRemoveBody {
    pub id: u32,
}

impl WireBody for PlayerRemoveBody {
    const TYPE: PacketType = PacketType::PlayerRemove;
    const SIZE: usize = 4;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.id);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(PlayerRemoveBody { id: get_u32(bytes, 0) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerUpdateBody {
    pub seq_nr: u32,
    pub id: u32,
    pub pos: [f32; 2],
    pub direction: u8,
    pub state: u8,
}

impl WireBody for PlayerUpdateBody {
    /// 6 pad bytes per spec §6.1 so the body stays 24 bytes / naturally
    /// aligned, even though nothing reads the padding.
    const TYPE: PacketType = PacketType::PlayerUpdate;
    const SIZE: usize = 4 + 4 + 8 + 1 + 1 + 6;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.seq_nr);
        put_u32(buf, self.id);
        put_f32(buf, self.pos[0]);
        put_f32(buf, self.pos[1]);
        put_u8(buf, self.direction);
        put_u8(buf, self.state);
        buf.extend_from_slice(&[0u8; 6]);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(PlayerUpdateBody {
            seq_nr: get_u32(bytes, 0),
            id: get_u32(bytes, 4),
            pos: [get_f32(bytes, 8), get_f32(bytes, 12)],
            direction: bytes[16],
            state: bytes[17],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerHealthBody {
    pub id: u32,
    pub damage: u32,
}

impl WireBody for PlayerHealthBody {
    const TYPE: PacketType = PacketType::PlayerHealth;
    const SIZE: usize = 8;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.id);
        put_u32(buf, self.damage);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(PlayerHealthBody { id: get_u32(bytes, 0), damage: get_u32(bytes, 4) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerDeathBody {
    pub id: u32,
}

impl WireBody for PlayerDeathBody {
    const TYPE: PacketType = PacketType::PlayerDeath;
    const SIZE: usize = 4;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.id);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(PlayerDeathBody { id: get_u32(bytes, 0) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerRespawnBody {
    pub id: u32,
    pub health: i32,
    pub pos: [f32; 2],
    pub state: u32,
    pub direction: u32,
}

impl WireBody for PlayerRespawnBody {
    const TYPE: PacketType = PacketType::PlayerRespawn;
    const SIZE: usize = 4 + 4 + 8 + 4 + 4;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.id);
        put_i32(buf, self.health);
        put_f32(buf, self.pos[0]);
        put_f32(buf, self.pos[1]);
        put_u32(buf, self.state);
        put_u32(buf, self.direction);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(PlayerRespawnBody {
            id: get_u32(bytes, 0),
            health: get_i32(bytes, 4),
            pos: [get_f32(bytes, 8), get_f32(bytes, 12)],
            state: get_u32(bytes, 16),
            direction: get_u32(bytes, 20),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerKeypressBody {
    pub id: u32,
    pub seq_nr: u32,
    pub key: u32,
    pub mods: u32,
    pub action: u32,
}

impl WireBody for PlayerKeypressBody {
    const TYPE: PacketType = PacketType::PlayerKeypress;
    const SIZE: usize = 20;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.id);
        put_u32(buf, self.seq_nr);
        put_u32(buf, self.key);
        put_u32(buf, self.mods);
        put_u32(buf, self.action);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(PlayerKeypressBody {
            id: get_u32(bytes, 0),
            seq_nr: get_u32(bytes, 4),
            key: get_u32(bytes, 8),
            mods: get_u32(bytes, 12),
            action: get_u32(bytes, 16),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameWorldInitBody {
    pub seed: u32,
    pub octaves: i32,
    pub bias: f32,
}

impl WireBody for GameWorldInitBody {
    const TYPE: PacketType = PacketType::GameWorldInit;
    const SIZE: usize = 12;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.seed);
        put_i32(buf, self.octaves);
        put_f32(buf, self.bias);
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        Ok(GameWorldInitBody {
            seed: get_u32(bytes, 0),
            octaves: get_i32(bytes, 4),
            bias: get_f32(bytes, 8),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameWorldObjectAddBody {
    pub length: u32,
    pub objects: Vec<GameObject>,
}

impl GameWorldObjectAddBody {
    pub const OBJECT_SIZE: usize = 8;
    pub const SIZE: usize = 4 + MAX_TRANSFER * Self::OBJECT_SIZE;
}

impl WireBody for GameWorldObjectAddBody {
    const TYPE: PacketType = PacketType::GameWorldObjectAdd;
    const SIZE: usize = GameWorldObjectAddBody::SIZE;

    fn write_body(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.length);
        for i in 0..MAX_TRANSFER {
            if let Some(o) = self.objects.get(i) {
                put_u32(buf, o.kind.to_wire());
                put_i32(buf, o.tile_index);
            } else {
                buf.extend_from_slice(&[0u8; GameWorldObjectAddBody::OBJECT_SIZE]);
            }
        }
    }

    fn read_body(bytes: &[u8]) -> Result<Self> {
        let length = get_u32(bytes, 0);
        let mut objects = Vec::new();
        for i in 0..MAX_TRANSFER {
            if (i as u32) >= length {
                break;
            }
            let off = 4 + i * GameWorldObjectAddBody::OBJECT_SIZE;
            let kind = GameObjectType::from_wire(get_u32(bytes, off))
                .ok_or_else(|| Error::Protocol("unknown game object type".into()))?;
            let tile_index = get_i32(bytes, off + 4);
            objects.push(GameObject { kind, tile_index });
        }
        Ok(GameWorldObjectAddBody { length, objects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// P1: codec round-trip for every packet type, and serialized length is
    /// exactly `size_of(type) + 8`.
    #[test]
    fn ping_round_trip() {
        let body = PingBody { time_ns: 1_234_567_890 };
        let bytes = encode(&body);
        assert_eq!(bytes.len(), HEADER_SIZE + PingBody::SIZE);
        assert_eq!(bytes.len() as u32, PacketType::Ping.size_of() + HEADER_SIZE as u32);
        let decoded: PingBody = decode(&bytes[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn player_update_round_trip() {
        let body = PlayerUpdateBody {
            seq_nr: 5,
            id: 1000,
            pos: [0.0, 4.0],
            direction: 3,
            state: 1,
        };
        let bytes = encode(&body);
        assert_eq!(bytes.len(), HEADER_SIZE + PlayerUpdateBody::SIZE);
        let decoded: PlayerUpdateBody = decode(&bytes[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn player_add_round_trip_with_name() {
        let body = PlayerAddBody {
            id: 1001,
            name: "alice".to_string(),
            pos: [10.0, -5.0],
            color: [1.0, 0.0, 0.5],
            health: 200,
            state: 0,
            direction: 0,
        };
        let bytes = encode(&body);
        let decoded: PlayerAddBody = decode(&bytes[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn message_history_partial_batch() {
        let history: Vec<MessageBody> = (0..3)
            .map(|i| MessageBody {
                kind: 0,
                timestamp: 100 + i,
                author: String::new(),
                content: format!("msg {i}"),
            })
            .collect();
        let body = MessageHistoryBody { count: 3, history: history.clone() };
        let bytes = encode(&body);
        assert_eq!(bytes.len(), HEADER_SIZE + MessageHistoryBody::SIZE);
        let decoded: MessageHistoryBody = decode(&bytes[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded.count, 3);
        assert_eq!(decoded.history, history);
    }

    #[test]
    fn decode_rejects_size_mismatch() {
        let bytes = vec![0u8; PingBody::SIZE - 1];
        let result: Result<PingBody> = decode(&bytes);
        assert!(result.is_err());
    }

    #[test]
    fn sequence_numbers_are_monotonic() {
        let a = next_sequence();
        let b = next_sequence();
        assert!(b > a);
    }

    #[test]
    fn fixed_str_truncates_unused_bytes_to_zero() {
        let mut buf = Vec::new();
        put_fixed_str(&mut buf, "hi", 8);
        assert_eq!(buf, vec![b'h', b'i', 0, 0, 0, 0, 0, 0]);
    }
}
