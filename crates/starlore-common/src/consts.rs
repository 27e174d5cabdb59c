//! Tunable constants, converted from `original_source/src/defines.h` and
//! the per-system `config.h` headers (spec §6.3).

/// Maximum simultaneous players the server will admit.
pub const MAX_PLAYER_COUNT: usize = 5;

/// Both client and server simulate at this rate (Hz).
pub const CLIENT_TICK_RATE: f32 = 64.0;
pub const SERVER_TICK_RATE: f32 = 64.0;

pub const CLIENT_TICK_DURATION: f32 = 1.0 / CLIENT_TICK_RATE;
pub const SERVER_TICK_DURATION: f32 = 1.0 / SERVER_TICK_RATE;

/// 0 is reserved to mean "no player".
pub const PLAYER_INVALID_ID: u32 = 0;

/// First id handed out by the server; ids increase monotonically after.
pub const FIRST_PLAYER_ID: u32 = 1000;

pub const PLAYER_MAX_NAME_LENGTH: usize = 32;

pub const PLAYER_VELOCITY: f32 = 300.0;
pub const PLAYER_DAMAGE_VALUE: i32 = 10;
pub const PLAYER_START_HEALTH: i32 = 200;

pub const PLAYER_ATTACK_COOLDOWN: f32 = 1.0;
pub const PLAYER_ATTACK_DURATION: f32 = 0.3;

pub const PLAYER_ROLL_COOLDOWN: f32 = 1.0;
pub const PLAYER_ROLL_DURATION: f32 = 0.4;
pub const PLAYER_ROLL_DISTANCE: f32 = 250.0;

pub const PLAYER_RESPAWN_COOLDOWN: f32 = 5.0;

/// Body/attack hitbox are both this square size (world units).
pub const PLAYER_HITBOX_SIZE: f32 = 32.0;

pub const MESSAGE_MAX_CONTENT_LENGTH: usize = 256;

/// Max `Message`s carried in one `MessageHistory` packet (bounded so the
/// packet fits in `INPUT_BUFFER + OVERFLOW_BUFFER`).
pub const HISTORY_BATCH: usize = 8;

pub const CHUNK_LENGTH: usize = 16;
pub const TILE_WIDTH_PX: i32 = 32;
pub const TILE_HEIGHT_PX: i32 = 32;

/// Max `GameObject`s carried in one `GameWorldObjectAdd` packet.
pub const MAX_TRANSFER: usize = 64;

/// Server-side input ring buffer capacity (shared across all clients).
pub const INPUT_RING_BUFFER_CAPACITY: usize = 256;

/// Max inputs drained from the ring buffer in a single simulation tick.
pub const PROCESSED_INPUT_LIMIT_PER_UPDATE: usize = 256;

/// Framing reader buffer sizes (spec §4.2).
pub const INPUT_BUFFER: usize = 4096;
pub const OVERFLOW_BUFFER: usize = 256;

/// XOR constant for the connection-validation handshake (spec §4.3). Not a
/// cryptographic secret — just a protocol sanity check.
pub const HANDSHAKE_XOR_CONSTANT: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// Spawn/respawn position, world units.
pub const SPAWN_POSITION: (i32, i32) = (0, 0);

/// Event bus bounds (spec §4.5).
pub const EVENT_QUEUE_CAPACITY: usize = 512;
pub const MAX_POLL_EVENTS: usize = 64;

/// Default chunk cache capacity (spec §4.4, E5 uses 4 for the worked example).
pub const DEFAULT_CACHE_MAX: usize = 64;

/// TCP keepalive interval applied to both the server's accepted sockets and
/// the client's connect socket (spec §1 ambient stack, `socket2`).
pub const TCP_KEEPALIVE_SECS: u64 = 60;
