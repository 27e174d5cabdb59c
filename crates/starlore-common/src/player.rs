//! Shared player data model (spec §3), converted from
//! `original_source/src/common/player_types.h`.

use crate::consts::PLAYER_INVALID_ID;
use crate::math::Vec2;

pub type PlayerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down = 0,
    Left = 1,
    Right = 2,
    Up = 3,
}

impl Direction {
    pub fn from_wire(v: u32) -> Option<Direction> {
        match v {
            0 => Some(Direction::Down),
            1 => Some(Direction::Left),
            2 => Some(Direction::Right),
            3 => Some(Direction::Up),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle = 0,
    Walk = 1,
    Attack = 2,
    Roll = 3,
    Block = 4,
    Dead = 5,
}

impl PlayerState {
    pub fn from_wire(v: u32) -> Option<PlayerState> {
        match v {
            0 => Some(PlayerState::Idle),
            1 => Some(PlayerState::Walk),
            2 => Some(PlayerState::Attack),
            3 => Some(PlayerState::Roll),
            4 => Some(PlayerState::Block),
            5 => Some(PlayerState::Dead),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    W,
    A,
    S,
    D,
    Space,
    LeftShift,
}

impl InputKey {
    pub fn from_wire(v: u32) -> Option<InputKey> {
        match v {
            0 => Some(InputKey::W),
            1 => Some(InputKey::A),
            2 => Some(InputKey::S),
            3 => Some(InputKey::D),
            4 => Some(InputKey::Space),
            5 => Some(InputKey::LeftShift),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u32 {
        match self {
            InputKey::W => 0,
            InputKey::A => 1,
            InputKey::S => 2,
            InputKey::D => 3,
            InputKey::Space => 4,
            InputKey::LeftShift => 5,
        }
    }
}

/// Server-authoritative player record (spec §3). The client keeps a reduced
/// projection of this (see `starlore-client::prediction::LocalPlayer` and
/// `starlore-client::interpolation::RemotePlayer`).
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: (f32, f32, f32),
    pub position: Vec2,
    pub direction: Direction,
    pub state: PlayerState,
    pub health: i32,

    pub attack_cd: f32,
    pub roll_cd: f32,
    pub respawn_cd: f32,

    pub attack_accumulator: f32,
    pub roll_accumulator: f32,
    /// The axis-aligned coordinate at roll initiation (spec §3).
    pub roll_start: f32,

    pub last_seq_nr: u32,
}

impl Player {
    pub fn new(id: PlayerId, position: Vec2, color: (f32, f32, f32)) -> Self {
        Player {
            id,
            name: String::new(),
            color,
            position,
            direction: Direction::Down,
            state: PlayerState::Idle,
            health: crate::consts::PLAYER_START_HEALTH,
            attack_cd: 0.0,
            roll_cd: 0.0,
            respawn_cd: 0.0,
            attack_accumulator: 0.0,
            roll_accumulator: 0.0,
            roll_start: 0.0,
            last_seq_nr: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.id != PLAYER_INVALID_ID && self.health > 0
    }
}

/// A locally-applied input awaiting its authoritative echo (spec §3, client
/// only). Converted from `packet_player_keypress_t` plus the ring-buffer
/// bookkeeping in `original_source/src/client/player.c`.
#[derive(Debug, Clone, Copy)]
pub struct PendingInput {
    pub seq_nr: u32,
    pub key: InputKey,
}
