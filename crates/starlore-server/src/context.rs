//! Process-wide server state, grouped into one context object per spec §9's
//! redesign note ("a rewrite should group each [global] into an explicit
//! context object passed through the call graph, with `run(ctx)` as the
//! only entry"). Converted from the scattered server globals in
//! `original_source/src/server/server.c` (`players`, `messages`,
//! `input_ring_buffer`, `game_world`).

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use starlore_common::consts::CHUNK_LENGTH;
use starlore_common::message::MessageLog;
use starlore_common::world::{GameMap, GameObject, GameObjectType};

use crate::input_queue::InputQueue;
use crate::players::PlayerTable;

/// Decorative world objects scattered once at startup, not a tunable
/// constant table entry (spec §6.3 doesn't fix this).
const WORLD_OBJECT_COUNT: usize = 32;

/// Side length, in chunks, of the area decorative objects are scattered
/// across around spawn.
const WORLD_OBJECT_SPREAD_CHUNKS: i32 = 8;

pub struct ServerContext {
    pub players: PlayerTable,
    pub messages: Mutex<MessageLog>,
    pub input_queue: InputQueue,
    pub map: GameMap,
    /// `[SUPPLEMENT]` cosmetic world dressing (spec §3), generated once from
    /// the world seed and immutable thereafter.
    pub world_objects: Vec<GameObject>,
}

impl ServerContext {
    pub fn new(map: GameMap) -> Arc<Self> {
        Arc::new(ServerContext {
            players: PlayerTable::new(),
            messages: Mutex::new(MessageLog::new()),
            input_queue: InputQueue::new(),
            world_objects: generate_world_objects(&map),
            map,
        })
    }
}

/// Deterministic from `map.seed`, matching the noise module's
/// `StdRng::seed_from_u64` pattern (spec §4.4).
fn generate_world_objects(map: &GameMap) -> Vec<GameObject> {
    let mut rng = StdRng::seed_from_u64(map.seed as u64 ^ 0x0B1E_C7_5A);
    let span = CHUNK_LENGTH as i32 * WORLD_OBJECT_SPREAD_CHUNKS;

    (0..WORLD_OBJECT_COUNT)
        .map(|_| {
            let kind = match rng.gen_range(0..4) {
                0 => GameObjectType::Tree,
                1 => GameObjectType::Bush,
                2 => GameObjectType::Rock,
                _ => GameObjectType::Lily,
            };
            let tile_index = rng.gen_range(-span..span);
            GameObject { kind, tile_index }
        })
        .collect()
}
