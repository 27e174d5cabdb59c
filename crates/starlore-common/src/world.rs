//! World-level shared types (spec §3), converted from
//! `original_source/src/common/game_world_types.h`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileType {
    Water = 0,
    Dirt = 1,
    Grass = 2,
    Stone = 3,
}

impl TileType {
    /// Thresholds fixed by spec §4.4.
    pub fn from_noise_value(v: f32) -> TileType {
        if v < 0.40 {
            TileType::Water
        } else if v < 0.45 {
            TileType::Dirt
        } else if v < 0.80 {
            TileType::Grass
        } else {
            TileType::Stone
        }
    }
}

/// Immutable after world init; identical on server and every client (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameMap {
    pub seed: u32,
    pub octave_count: i32,
    pub bias: i32,
}

impl GameMap {
    /// Takes `bias` as `f32` (the noise-generation parameter spec §6.1
    /// describes) and stores it fixed-point (`bias * 1000`, rounded) so
    /// `GameMap` stays a plain-integer struct; `bias_f32` converts back.
    pub fn new(seed: u32, octave_count: i32, bias: f32) -> Self {
        GameMap {
            seed,
            octave_count,
            bias: (bias * 1000.0).round() as i32,
        }
    }

    pub fn bias_f32(&self) -> f32 {
        self.bias as f32 / 1000.0
    }
}

/// Cosmetic world dressing placed on top of already-generated terrain.
/// `[SUPPLEMENT]` from `original_source/src/common/game_world_types.h`,
/// transmitted once via `GameWorldObjectAdd` (spec §4.1/§6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameObjectType {
    None = 0,
    Tree = 1,
    Bush = 2,
    Rock = 3,
    Lily = 4,
}

impl GameObjectType {
    pub fn from_wire(v: u32) -> Option<GameObjectType> {
        match v {
            0 => Some(GameObjectType::None),
            1 => Some(GameObjectType::Tree),
            2 => Some(GameObjectType::Bush),
            3 => Some(GameObjectType::Rock),
            4 => Some(GameObjectType::Lily),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameObject {
    pub kind: GameObjectType,
    /// Index into the flattened tile grid the object sits on top of.
    pub tile_index: i32,
}
