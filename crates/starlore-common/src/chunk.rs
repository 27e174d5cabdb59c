//! Chunked procedural world streaming (spec §4.4), converted from the
//! chunk-cache description in spec §3/§4.4 (no direct C original — the
//! source renders the whole map at once; chunking is this redesign's
//! answer to "infinite tile world" in spec §1).

use crate::consts::{CHUNK_LENGTH, DEFAULT_CACHE_MAX};
use crate::noise::{chunk_seed, generate_2d};
use crate::world::{GameMap, TileType};

pub const CHUNK_TILE_COUNT: usize = CHUNK_LENGTH * CHUNK_LENGTH;

#[derive(Debug, Clone)]
pub struct Chunk {
    pub x: i32,
    pub y: i32,
    pub tiles: [TileType; CHUNK_TILE_COUNT],
    pub age: i32,
}

impl Chunk {
    /// Derives a chunk's tiles purely from `(map.seed, x, y, map.octave_count,
    /// map.bias)` (spec §3) — chunks never cross the wire.
    pub fn generate(map: &GameMap, x: i32, y: i32) -> Chunk {
        let seed = chunk_seed(map.seed, x, y);
        let noise = generate_2d(seed, CHUNK_LENGTH, CHUNK_LENGTH, map.octave_count, map.bias_f32());

        let mut tiles = [TileType::Water; CHUNK_TILE_COUNT];
        for (i, v) in noise.into_iter().enumerate() {
            tiles[i] = TileType::from_noise_value(v);
        }

        Chunk { x, y, tiles, age: 0 }
    }
}

/// Age-based eviction cache keyed by integer chunk coordinates (spec §4.4,
/// invariant P4). Lookup is linear — the bound (`CACHE_MAX`, typically in
/// the tens) makes that cheap and keeps the container a plain `Vec`, the
/// same choice spec §9 makes for the bespoke containers in the original.
pub struct ChunkCache {
    capacity: usize,
    entries: Vec<Chunk>,
}

impl ChunkCache {
    pub fn new(capacity: usize) -> Self {
        ChunkCache {
            capacity: capacity.max(1),
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position_of(&self, x: i32, y: i32) -> Option<usize> {
        self.entries.iter().position(|c| c.x == x && c.y == y)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Chunk> {
        self.entries.iter().find(|c| c.x == x && c.y == y)
    }

    /// Index of the entry with the largest `age` (ties broken arbitrarily —
    /// here, by first occurrence, matching a plain linear scan rather than
    /// `Iterator::max_by_key`, which keeps the *last* maximum on ties).
    fn max_age_index(&self) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;
        for (i, c) in self.entries.iter().enumerate() {
            if best.map_or(true, |(_, age)| c.age > age) {
                best = Some((i, c.age));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Ensures every chunk coordinate in `visible` is present and has
    /// `age == 0`; ages every other cached entry up once per miss (spec
    /// §4.4). Returns the chunks now resident for `visible`, in the same
    /// order as `visible`.
    pub fn render_visible(&mut self, map: &GameMap, visible: &[(i32, i32)]) -> Vec<Chunk> {
        let mut result = Vec::with_capacity(visible.len());

        for &(x, y) in visible {
            match self.position_of(x, y) {
                Some(idx) => {
                    self.entries[idx].age = 0;
                    result.push(self.entries[idx].clone());
                }
                None => {
                    if self.entries.len() >= self.capacity {
                        if let Some(evict_idx) = self.max_age_index() {
                            self.entries.remove(evict_idx);
                        }
                    }
                    let chunk = Chunk::generate(map, x, y);
                    self.entries.push(chunk.clone());
                    result.push(chunk);

                    for entry in &mut self.entries {
                        if !visible.contains(&(entry.x, entry.y)) {
                            entry.age += 1;
                        }
                    }
                }
            }
        }

        result
    }
}
