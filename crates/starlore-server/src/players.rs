//! Server-side player table (spec §3/§5), converted from the client-array
//! plus per-slot socket ownership in `original_source/src/server/server.c`.
//!
//! Both the IO threads and the simulation thread read this table; per spec
//! §5 only the simulation thread mutates in-game player state, while a
//! connection's IO thread only ever touches its own slot's `name`/`writer`
//! fields at join/leave. A coarse `parking_lot::RwLock` over the whole
//! table is the simplest implementation of that contract and matches the
//! teacher's preference for `parking_lot` over bare `std::sync`.

use std::sync::Arc;

use parking_lot::RwLock;

use starlore_common::consts::{FIRST_PLAYER_ID, MAX_PLAYER_COUNT, PLAYER_START_HEALTH, SPAWN_POSITION};
use starlore_common::error::{Error, Result};
use starlore_common::math::Vec2;
use starlore_common::player::{Player, PlayerId};
use starlore_common::PacketWriter;

/// One occupied seat in the player table: the authoritative player record
/// plus the socket used to reach that client.
pub struct Occupant {
    pub player: Player,
    pub writer: Arc<PacketWriter>,
    /// Set once the client's `PlayerInitConfirm` arrives (spec §9 open
    /// question: gate join fan-out on the confirm, not on `PlayerInit`).
    pub confirmed: bool,
}

/// Fixed-size slot table keyed by position, not by id — ids are never
/// reused (monotonic from `FIRST_PLAYER_ID`) even though slots are, which
/// is what makes P7 ("no ghost state") trivial: a freed slot's `Option`
/// goes back to `None` and the next occupant is a fresh `Player`.
pub struct PlayerTable {
    slots: RwLock<Vec<Option<Occupant>>>,
    next_id: RwLock<PlayerId>,
}

impl PlayerTable {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_PLAYER_COUNT);
        slots.resize_with(MAX_PLAYER_COUNT, || None);
        PlayerTable {
            slots: RwLock::new(slots),
            next_id: RwLock::new(FIRST_PLAYER_ID),
        }
    }

    /// Allocates a free slot and a fresh monotonic id, spawning the player
    /// at `SPAWN_POSITION` with full health. Fails with
    /// `Error::SlotUnavailable` when every slot is occupied (spec §7:
    /// resource exhaustion on join).
    pub fn allocate(&self, writer: Arc<PacketWriter>, color: (f32, f32, f32)) -> Result<PlayerId> {
        let mut slots = self.slots.write();
        let free = slots.iter().position(|s| s.is_none()).ok_or(Error::SlotUnavailable)?;

        let mut next_id = self.next_id.write();
        let id = *next_id;
        *next_id += 1;

        let (x, y) = SPAWN_POSITION;
        let mut player = Player::new(id, Vec2::new(x as f32, y as f32), color);
        player.health = PLAYER_START_HEALTH;

        slots[free] = Some(Occupant { player, writer, confirmed: false });
        Ok(id)
    }

    /// Marks a pending join confirmed and sets its display name (spec §4.7:
    /// the join-confirm handshake). Returns `false` if `id` has no slot.
    pub fn confirm_join(&self, id: PlayerId, name: String) -> bool {
        let mut slots = self.slots.write();
        for slot in slots.iter_mut() {
            if let Some(occupant) = slot {
                if occupant.player.id == id {
                    occupant.player.name = name;
                    occupant.confirmed = true;
                    return true;
                }
            }
        }
        false
    }

    /// Frees the slot belonging to `id`, if any (spec §4.7 disconnect
    /// cleanup / §3 lifecycle).
    pub fn remove(&self, id: PlayerId) -> bool {
        let mut slots = self.slots.write();
        for slot in slots.iter_mut() {
            if matches!(slot, Some(o) if o.player.id == id) {
                *slot = None;
                return true;
            }
        }
        false
    }

    pub fn with_player<R>(&self, id: PlayerId, f: impl FnOnce(&Player) -> R) -> Option<R> {
        let slots = self.slots.read();
        slots.iter().flatten().find(|o| o.player.id == id).map(|o| f(&o.player))
    }

    pub fn with_player_mut<R>(&self, id: PlayerId, f: impl FnOnce(&mut Player) -> R) -> Option<R> {
        let mut slots = self.slots.write();
        slots.iter_mut().flatten().find(|o| o.player.id == id).map(|o| f(&mut o.player))
    }

    pub fn writer(&self, id: PlayerId) -> Option<Arc<PacketWriter>> {
        let slots = self.slots.read();
        slots.iter().flatten().find(|o| o.player.id == id).map(|o| o.writer.clone())
    }

    /// Snapshot of every confirmed player's id and writer, for broadcast
    /// fan-out. Cloning here (not holding the lock across IO) keeps send
    /// failures on one socket from blocking the table for everyone else.
    pub fn broadcast_targets(&self) -> Vec<(PlayerId, Arc<PacketWriter>)> {
        let slots = self.slots.read();
        slots
            .iter()
            .flatten()
            .filter(|o| o.confirmed)
            .map(|o| (o.player.id, o.writer.clone()))
            .collect()
    }

    /// Grants the simulation tick exclusive access to the whole slot array
    /// for the duration of one tick — input application needs to look up
    /// an arbitrary other player's position (attack hitbox resolution)
    /// while mutating the table, which per-id locking can't express
    /// without either re-entrant locking or collecting a snapshot first.
    pub fn with_all_mut<R>(&self, f: impl FnOnce(&mut Vec<Option<Occupant>>) -> R) -> R {
        let mut slots = self.slots.write();
        f(&mut slots)
    }

    pub fn is_full(&self) -> bool {
        let slots = self.slots.read();
        slots.iter().all(|s| s.is_some())
    }
}

impl Default for PlayerTable {
    fn default() -> Self {
        PlayerTable::new()
    }
}
