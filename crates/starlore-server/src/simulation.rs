//! Fixed-tick authoritative simulation (spec §4.6, component C8), converted
//! from the per-frame player/combat update in
//! `original_source/src/server/server.c` (`server_update_players`).

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use starlore_common::consts::{
    PLAYER_ATTACK_COOLDOWN, PLAYER_ATTACK_DURATION, PLAYER_DAMAGE_VALUE, PLAYER_HITBOX_SIZE,
    PLAYER_RESPAWN_COOLDOWN, PLAYER_ROLL_COOLDOWN, PLAYER_ROLL_DISTANCE, PLAYER_ROLL_DURATION,
    PLAYER_START_HEALTH, PLAYER_VELOCITY, PROCESSED_INPUT_LIMIT_PER_UPDATE, SERVER_TICK_DURATION,
    SPAWN_POSITION,
};
use starlore_common::math::{rect_collide, Vec2};
use starlore_common::message::Message;
use starlore_common::packet::{
    self, PlayerDeathBody, PlayerHealthBody, PlayerKeypressBody, PlayerRespawnBody, PlayerUpdateBody,
};
use starlore_common::player::{Direction, InputKey, Player, PlayerId, PlayerState};

use crate::connection::broadcast_message;
use crate::context::ServerContext;
use crate::players::Occupant;

/// Runs the fixed-tick loop forever on the calling thread (spec §4.6/§5:
/// its own thread, sleeping `1 / SERVER_TICK_RATE` between ticks).
pub fn run(ctx: Arc<ServerContext>) {
    let tick_duration = Duration::from_secs_f32(SERVER_TICK_DURATION);
    loop {
        let started = Instant::now();
        tick(&ctx, SERVER_TICK_DURATION);
        let elapsed = started.elapsed();
        if elapsed < tick_duration {
            thread::sleep(tick_duration - elapsed);
        }
    }
}

/// One simulation tick: drain inputs, resolve combat, bookkeep cooldowns,
/// and fan out every resulting packet. The slot table is locked only for
/// the pure-state part (`with_all_mut`); every `send` happens afterward so
/// a slow or dead socket never holds up the next tick's mutation.
pub fn tick(ctx: &ServerContext, dt: f32) {
    let inputs = ctx.input_queue.drain(PROCESSED_INPUT_LIMIT_PER_UPDATE);

    let mut updates: Vec<PlayerUpdateBody> = Vec::new();
    let mut healths: Vec<PlayerHealthBody> = Vec::new();
    let mut deaths: Vec<(PlayerId, String)> = Vec::new();
    let mut respawns: Vec<PlayerRespawnBody> = Vec::new();

    ctx.players.with_all_mut(|slots| {
        let mut damage: Vec<(PlayerId, i32)> = Vec::new();

        for input in &inputs {
            apply_input(slots, input, &mut damage, &mut updates);
        }

        apply_damage(slots, &damage, &mut healths, &mut deaths);
        tick_cooldowns(slots, dt, &mut updates, &mut respawns);
    });

    for update in &updates {
        broadcast(ctx, update);
    }
    for health in &healths {
        broadcast(ctx, health);
    }
    for (id, name) in &deaths {
        broadcast(ctx, &PlayerDeathBody { id: *id });
        let message = Message::system(format!("{name} died!"));
        broadcast_message(ctx, &message, None);
        ctx.messages.lock().push(message);
    }
    for respawn in &respawns {
        broadcast(ctx, respawn);
    }
}

fn broadcast<T: starlore_common::packet::WireBody>(ctx: &ServerContext, body: &T) {
    let bytes = packet::encode(body);
    for (_, writer) in ctx.players.broadcast_targets() {
        let _ = writer.send(&bytes);
    }
}

/// Unit-axis vector a player moves/rolls/attacks along when facing `d`.
fn direction_vector(d: Direction) -> Vec2 {
    match d {
        Direction::Up => Vec2::new(0.0, 1.0),
        Direction::Down => Vec2::new(0.0, -1.0),
        Direction::Left => Vec2::new(-1.0, 0.0),
        Direction::Right => Vec2::new(1.0, 0.0),
    }
}

fn key_to_direction(key: InputKey) -> Option<Direction> {
    match key {
        InputKey::W => Some(Direction::Up),
        InputKey::S => Some(Direction::Down),
        InputKey::A => Some(Direction::Left),
        InputKey::D => Some(Direction::Right),
        InputKey::Space | InputKey::LeftShift => None,
    }
}

/// A half-depth rectangle placed flush against the player's facing edge
/// (spec §4.6: "a half-depth rectangle of size 32 ahead of the player").
fn attack_hitbox(position: Vec2, direction: Direction) -> (Vec2, Vec2) {
    let dir = direction_vector(direction);
    let half_depth = PLAYER_HITBOX_SIZE / 2.0;
    let offset = PLAYER_HITBOX_SIZE / 2.0 + half_depth / 2.0;
    let center = Vec2::new(position.x + dir.x * offset, position.y + dir.y * offset);
    let size = if dir.x != 0.0 {
        Vec2::new(half_depth, PLAYER_HITBOX_SIZE)
    } else {
        Vec2::new(PLAYER_HITBOX_SIZE, half_depth)
    };
    (center, size)
}

fn body_size() -> Vec2 {
    Vec2::new(PLAYER_HITBOX_SIZE, PLAYER_HITBOX_SIZE)
}

fn update_body(p: &Player) -> PlayerUpdateBody {
    PlayerUpdateBody {
        seq_nr: p.last_seq_nr,
        id: p.id,
        pos: [p.position.x, p.position.y],
        direction: p.direction.to_wire() as u8,
        state: p.state.to_wire() as u8,
    }
}

fn find_index(slots: &[Option<Occupant>], id: PlayerId) -> Option<usize> {
    slots.iter().position(|s| matches!(s, Some(o) if o.player.id == id))
}

/// Spec §4.6 step 1: applies one input to the player it names. Movement,
/// attack initiation, and roll initiation each push their own
/// `PlayerUpdate` immediately — the spec's "mark modified, broadcast at end
/// of step" collapses to "broadcast right here" since nothing else reads
/// `updates` before it is sent.
fn apply_input(
    slots: &mut [Option<Occupant>],
    input: &PlayerKeypressBody,
    damage: &mut Vec<(PlayerId, i32)>,
    updates: &mut Vec<PlayerUpdateBody>,
) {
    let Some(idx) = find_index(slots, input.id) else {
        starlore_common::log::log_warn(&format!("keypress for unknown player id {}", input.id));
        return;
    };
    let Some(key) = InputKey::from_wire(input.key) else {
        starlore_common::log::log_warn(&format!("unknown input key {}", input.key));
        return;
    };
    if !slots[idx].as_ref().unwrap().player.is_alive() {
        return;
    }

    match key {
        InputKey::LeftShift => apply_roll(slots, idx, input.seq_nr, updates),
        InputKey::Space => apply_attack(slots, idx, input.seq_nr, damage, updates),
        _ => {
            if let Some(direction) = key_to_direction(key) {
                apply_move(slots, idx, direction, input.seq_nr, updates);
            }
        }
    }
}

fn apply_roll(slots: &mut [Option<Occupant>], idx: usize, seq_nr: u32, updates: &mut Vec<PlayerUpdateBody>) {
    let o = slots[idx].as_mut().unwrap();
    if o.player.roll_cd > 0.0 {
        return;
    }

    let old_pos = o.player.position;
    let dir = direction_vector(o.player.direction);
    let axis_value = if dir.x != 0.0 { old_pos.x } else { old_pos.y };

    o.player.state = PlayerState::Roll;
    o.player.roll_cd = PLAYER_ROLL_COOLDOWN;
    o.player.roll_accumulator = 0.0;
    o.player.roll_start = axis_value;
    o.player.position =
        Vec2::new(old_pos.x + dir.x * PLAYER_ROLL_DISTANCE, old_pos.y + dir.y * PLAYER_ROLL_DISTANCE).truncate();
    o.player.last_seq_nr = seq_nr;

    // The broadcast position is roll_start on the rolling axis (spec §4.6
    // step 3 / §9): since only that axis changed, the pre-teleport vector
    // already carries exactly that value on both axes.
    updates.push(PlayerUpdateBody {
        seq_nr,
        id: o.player.id,
        pos: [old_pos.x, old_pos.y],
        direction: o.player.direction.to_wire() as u8,
        state: PlayerState::Roll.to_wire() as u8,
    });
}

fn apply_attack(
    slots: &mut [Option<Occupant>],
    idx: usize,
    seq_nr: u32,
    damage: &mut Vec<(PlayerId, i32)>,
    updates: &mut Vec<PlayerUpdateBody>,
) {
    if slots[idx].as_ref().unwrap().player.attack_cd > 0.0 {
        return;
    }

    let (position, direction) = {
        let p = &slots[idx].as_ref().unwrap().player;
        (p.position, p.direction)
    };
    let (hit_center, hit_size) = attack_hitbox(position, direction);

    for (j, slot) in slots.iter().enumerate() {
        if j == idx {
            continue;
        }
        if let Some(other) = slot {
            if other.player.is_alive() && rect_collide(hit_center, hit_size, other.player.position, body_size()) {
                match damage.iter_mut().find(|(id, _)| *id == other.player.id) {
                    Some((_, amount)) => *amount += PLAYER_DAMAGE_VALUE,
                    None => damage.push((other.player.id, PLAYER_DAMAGE_VALUE)),
                }
            }
        }
    }

    let o = slots[idx].as_mut().unwrap();
    o.player.state = PlayerState::Attack;
    o.player.attack_cd = PLAYER_ATTACK_COOLDOWN;
    o.player.attack_accumulator = 0.0;
    o.player.last_seq_nr = seq_nr;
    updates.push(update_body(&o.player));
}

fn apply_move(
    slots: &mut [Option<Occupant>],
    idx: usize,
    direction: Direction,
    seq_nr: u32,
    updates: &mut Vec<PlayerUpdateBody>,
) {
    let o = slots[idx].as_mut().unwrap();
    let dir = direction_vector(direction);
    let step = starlore_common::consts::CLIENT_TICK_DURATION * PLAYER_VELOCITY;
    let delta = Vec2::new(dir.x * step, dir.y * step);

    let direction_changed = o.player.direction != direction;
    let was_attacking = o.player.state == PlayerState::Attack;

    o.player.position = o.player.position.add(delta).truncate();
    o.player.direction = direction;
    if !was_attacking || direction_changed {
        o.player.state = PlayerState::Walk;
    }
    o.player.last_seq_nr = seq_nr;

    updates.push(update_body(&o.player));
}

/// Spec §4.6 step 2: subtracts accumulated per-tick damage and transitions
/// newly-dead players. Runs after every input is applied, so damage is
/// always computed against positions already updated this tick (P6).
fn apply_damage(
    slots: &mut [Option<Occupant>],
    damage: &[(PlayerId, i32)],
    healths: &mut Vec<PlayerHealthBody>,
    deaths: &mut Vec<(PlayerId, String)>,
) {
    for &(id, amount) in damage {
        let Some(o) = slots.iter_mut().flatten().find(|o| o.player.id == id) else {
            let err = starlore_common::error::Error::Invariant(format!("damage target {id} vanished mid-tick"));
            starlore_common::log::log_warn(&err.to_string());
            continue;
        };
        o.player.health -= amount;
        healths.push(PlayerHealthBody { id, damage: amount as u32 });

        if o.player.health <= 0 && o.player.state != PlayerState::Dead {
            o.player.state = PlayerState::Dead;
            o.player.respawn_cd = PLAYER_RESPAWN_COOLDOWN;
            deaths.push((id, o.player.name.clone()));
        }
    }
}

/// Spec §4.6 step 4: per-player cooldown/timer bookkeeping. Respawn checks
/// run last, after damage, so a player killed this tick cannot respawn
/// this tick (its `respawn_cd` was just set positive).
fn tick_cooldowns(
    slots: &mut [Option<Occupant>],
    dt: f32,
    updates: &mut Vec<PlayerUpdateBody>,
    respawns: &mut Vec<PlayerRespawnBody>,
) {
    for slot in slots.iter_mut().flatten() {
        let p = &mut slot.player;
        p.attack_cd -= dt;
        p.roll_cd -= dt;
        p.respawn_cd -= dt;

        match p.state {
            PlayerState::Attack => {
                p.attack_accumulator += dt;
                if p.attack_accumulator >= PLAYER_ATTACK_DURATION {
                    p.state = PlayerState::Idle;
                    updates.push(update_body(p));
                }
            }
            PlayerState::Roll => {
                p.roll_accumulator += dt;
                if p.roll_accumulator >= PLAYER_ROLL_DURATION {
                    p.state = PlayerState::Idle;
                    updates.push(update_body(p));
                }
            }
            PlayerState::Dead if p.respawn_cd <= 0.0 => {
                p.state = PlayerState::Idle;
                p.health = PLAYER_START_HEALTH;
                let (x, y) = SPAWN_POSITION;
                p.position = Vec2::new(x as f32, y as f32);
                p.direction = Direction::Down;
                respawns.push(PlayerRespawnBody {
                    id: p.id,
                    health: p.health,
                    pos: [p.position.x, p.position.y],
                    state: p.state.to_wire(),
                    direction: p.direction.to_wire(),
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ServerContext;
    use starlore_common::player::PlayerState;
    use starlore_common::world::GameMap;
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;

    fn ctx() -> Arc<ServerContext> {
        ServerContext::new(GameMap::new(1, 3, 2.0))
    }

    fn dummy_writer() -> Arc<starlore_common::PacketWriter> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let _ = listener.accept().unwrap();
        Arc::new(starlore_common::PacketWriter::new(client))
    }

    fn join(ctx: &ServerContext, name: &str) -> u32 {
        let id = ctx.players.allocate(dummy_writer(), (1.0, 0.0, 0.0)).unwrap();
        ctx.players.confirm_join(id, name.to_string());
        id
    }

    /// E3: predicted move + reconcile. W press, seq 5, at (0,0) -> (0,4).
    #[test]
    fn e3_move_matches_client_truncation() {
        let ctx = ctx();
        let id = join(&ctx, "alice");
        ctx.input_queue
            .sender()
            .try_send(PlayerKeypressBody { id, seq_nr: 5, key: InputKey::W.to_wire(), mods: 0, action: 1 });

        tick(&ctx, SERVER_TICK_DURATION);

        let pos = ctx.players.with_player(id, |p| p.position).unwrap();
        assert_eq!(pos, Vec2::new(0.0, 4.0));
        let seq = ctx.players.with_player(id, |p| p.last_seq_nr).unwrap();
        assert_eq!(seq, 5);
    }

    /// E4: attack and kill. P2 within P1's hitbox takes repeated damage
    /// until dead, then the cooldown-gated respawn restores it.
    #[test]
    fn e4_attack_kills_and_respawns() {
        let ctx = ctx();
        let p1 = join(&ctx, "p1");
        let p2 = join(&ctx, "p2");
        ctx.players.with_player_mut(p1, |p| {
            p.position = Vec2::new(0.0, 0.0);
            p.direction = Direction::Right;
        });
        ctx.players.with_player_mut(p2, |p| p.position = Vec2::new(24.0, 0.0));

        let mut seq = 0;
        while ctx.players.with_player(p2, |p| p.health).unwrap() > 0 {
            seq += 1;
            ctx.input_queue.sender().try_send(PlayerKeypressBody {
                id: p1,
                seq_nr: seq,
                key: InputKey::Space.to_wire(),
                mods: 0,
                action: 1,
            });
            tick(&ctx, SERVER_TICK_DURATION);
            ctx.players.with_player_mut(p1, |p| p.attack_cd = 0.0);
        }

        assert_eq!(ctx.players.with_player(p2, |p| p.state).unwrap(), PlayerState::Dead);
        assert!(ctx.players.with_player(p2, |p| p.respawn_cd).unwrap() > 0.0);

        // Fast-forward past the respawn cooldown with large-dt ticks.
        tick(&ctx, PLAYER_RESPAWN_COOLDOWN + 1.0);
        assert_eq!(ctx.players.with_player(p2, |p| p.state).unwrap(), PlayerState::Idle);
        assert_eq!(ctx.players.with_player(p2, |p| p.health).unwrap(), PLAYER_START_HEALTH);
    }

    /// E6: roll initiation echoes `roll_start`, not the teleported position.
    #[test]
    fn e6_roll_broadcasts_start_not_end() {
        let ctx = ctx();
        let id = join(&ctx, "roller");
        ctx.players.with_player_mut(id, |p| {
            p.position = Vec2::new(0.0, 100.0);
            p.direction = Direction::Up;
        });
        ctx.input_queue.sender().try_send(PlayerKeypressBody {
            id,
            seq_nr: 1,
            key: InputKey::LeftShift.to_wire(),
            mods: 0,
            action: 1,
        });

        tick(&ctx, SERVER_TICK_DURATION);

        let (state, roll_start, pos) =
            ctx.players.with_player(id, |p| (p.state, p.roll_start, p.position)).unwrap();
        assert_eq!(state, PlayerState::Roll);
        assert_eq!(roll_start, 100.0);
        assert_eq!(pos, Vec2::new(0.0, 100.0 + PLAYER_ROLL_DISTANCE));
    }

    /// P6: two inputs from the same client, enqueued in the same tick,
    /// apply in order — a roll that relocates the attacker 250px must be
    /// visible to an attack enqueued right after it. A victim placed only
    /// within the *post-roll* hitbox is untouched if the inputs were
    /// (wrongly) applied out of order.
    #[test]
    fn p6_inputs_apply_in_enqueue_order_within_a_tick() {
        let ctx = ctx();
        let attacker = join(&ctx, "attacker");
        let victim = join(&ctx, "victim");
        ctx.players.with_player_mut(attacker, |p| {
            p.position = Vec2::new(0.0, 0.0);
            p.direction = Direction::Right;
        });
        ctx.players.with_player_mut(victim, |p| p.position = Vec2::new(PLAYER_ROLL_DISTANCE + 24.0, 0.0));

        ctx.input_queue.sender().try_send(PlayerKeypressBody {
            id: attacker,
            seq_nr: 1,
            key: InputKey::LeftShift.to_wire(),
            mods: 0,
            action: 1,
        });
        ctx.input_queue.sender().try_send(PlayerKeypressBody {
            id: attacker,
            seq_nr: 2,
            key: InputKey::Space.to_wire(),
            mods: 0,
            action: 1,
        });

        tick(&ctx, SERVER_TICK_DURATION);

        let health = ctx.players.with_player(victim, |p| p.health).unwrap();
        assert_eq!(health, PLAYER_START_HEALTH - PLAYER_DAMAGE_VALUE);
    }

    #[test]
    fn dead_player_ignores_further_input() {
        let ctx = ctx();
        let id = join(&ctx, "ghost");
        ctx.players.with_player_mut(id, |p| {
            p.health = 0;
            p.state = PlayerState::Dead;
            p.respawn_cd = 5.0;
        });
        ctx.input_queue.sender().try_send(PlayerKeypressBody {
            id,
            seq_nr: 1,
            key: InputKey::D.to_wire(),
            mods: 0,
            action: 1,
        });
        let before = ctx.players.with_player(id, |p| p.position).unwrap();
        tick(&ctx, SERVER_TICK_DURATION);
        let after = ctx.players.with_player(id, |p| p.position).unwrap();
        assert_eq!(before, after);
    }
}
