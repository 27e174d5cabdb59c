//! Client-side prediction core (spec §4.8, component C10), converted from
//! `original_source/src/client/player.c`'s local-apply-then-reconcile loop.
//!
//! The local player applies every input immediately using the exact same
//! step function the server's simulation tick uses, then keeps the input
//! in a pending queue until the matching `PlayerUpdate` echo arrives. On
//! echo it rewinds to the authoritative position and replays whatever
//! pending inputs are left (spec §4.8, invariant P5).

use std::collections::VecDeque;

use starlore_common::consts::{
    CLIENT_TICK_DURATION, PLAYER_ATTACK_COOLDOWN, PLAYER_ROLL_COOLDOWN, PLAYER_ROLL_DISTANCE, PLAYER_VELOCITY,
};
use starlore_common::log::log_warn;
use starlore_common::math::Vec2;
use starlore_common::packet::PlayerUpdateBody;
use starlore_common::player::{Direction, InputKey, PendingInput, Player, PlayerId, PlayerState};

pub struct LocalPlayer {
    pub player: Player,
    pending: VecDeque<PendingInput>,
}

impl LocalPlayer {
    pub fn new(id: PlayerId, position: Vec2, color: (f32, f32, f32)) -> Self {
        LocalPlayer { player: Player::new(id, position, color), pending: VecDeque::new() }
    }

    /// Applies `key` locally and remembers it as pending until the
    /// matching server echo arrives. Returns `false` if the action was
    /// gated off by a cooldown (e.g. roll while `roll_cd > 0`), in which
    /// case nothing is sent — mirrors the server rejecting the same input.
    pub fn apply_local(&mut self, seq_nr: u32, key: InputKey) -> bool {
        if !self.step(key) {
            return false;
        }
        self.pending.push_back(PendingInput { seq_nr, key });
        true
    }

    /// The deterministic step both the initial local apply and reconcile's
    /// replay use (spec §4.8: "the same deterministic step"). Returns
    /// `false` if a cooldown blocked the action.
    fn step(&mut self, key: InputKey) -> bool {
        if !self.player.is_alive() {
            return false;
        }
        match key {
            InputKey::LeftShift => self.step_roll(),
            InputKey::Space => self.step_attack(),
            InputKey::W | InputKey::A | InputKey::S | InputKey::D => {
                self.step_move(direction_for(key));
                true
            }
        }
    }

    fn step_roll(&mut self) -> bool {
        if self.player.roll_cd > 0.0 {
            return false;
        }
        let dir = direction_vector(self.player.direction);
        let old_pos = self.player.position;
        let axis_value = if dir.x != 0.0 { old_pos.x } else { old_pos.y };

        self.player.state = PlayerState::Roll;
        self.player.roll_cd = PLAYER_ROLL_COOLDOWN;
        self.player.roll_accumulator = 0.0;
        self.player.roll_start = axis_value;
        self.player.position =
            Vec2::new(old_pos.x + dir.x * PLAYER_ROLL_DISTANCE, old_pos.y + dir.y * PLAYER_ROLL_DISTANCE).truncate();
        true
    }

    fn step_attack(&mut self) -> bool {
        if self.player.attack_cd > 0.0 {
            return false;
        }
        self.player.state = PlayerState::Attack;
        self.player.attack_cd = PLAYER_ATTACK_COOLDOWN;
        self.player.attack_accumulator = 0.0;
        true
    }

    fn step_move(&mut self, direction: Direction) {
        let dir = direction_vector(direction);
        let step = CLIENT_TICK_DURATION * PLAYER_VELOCITY;
        let delta = Vec2::new(dir.x * step, dir.y * step);

        let direction_changed = self.player.direction != direction;
        let was_attacking = self.player.state == PlayerState::Attack;

        self.player.position = self.player.position.add(delta).truncate();
        self.player.direction = direction;
        if !was_attacking || direction_changed {
            self.player.state = PlayerState::Walk;
        }
    }

    /// Rewinds to the authoritative echo and replays whatever pending
    /// inputs remain (spec §4.8). Abandons reconciliation this round if
    /// the echoed `seq_nr` isn't found in the pending queue.
    pub fn reconcile(&mut self, update: &PlayerUpdateBody) {
        let mut found = false;
        while let Some(front) = self.pending.pop_front() {
            if front.seq_nr == update.seq_nr {
                found = true;
                break;
            }
        }
        if !found {
            log_warn(&format!("reconcile: seq_nr {} not found in pending queue, abandoning", update.seq_nr));
            return;
        }

        self.player.position = Vec2::new(update.pos[0], update.pos[1]);
        if let Some(direction) = Direction::from_wire(update.direction as u32) {
            self.player.direction = direction;
        }
        if let Some(state) = PlayerState::from_wire(update.state as u32) {
            // Roll/attack state changes are server-authoritative (spec §4.8):
            // reset the local roll animation even if already mid-roll.
            if state == PlayerState::Roll {
                let dir = direction_vector(self.player.direction);
                self.player.roll_start = if dir.x != 0.0 { self.player.position.x } else { self.player.position.y };
                self.player.roll_accumulator = 0.0;
            }
            self.player.state = state;
        }

        let remaining: Vec<PendingInput> = self.pending.iter().copied().collect();
        for input in remaining {
            self.step(input.key);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn direction_vector(d: Direction) -> Vec2 {
    match d {
        Direction::Up => Vec2::new(0.0, 1.0),
        Direction::Down => Vec2::new(0.0, -1.0),
        Direction::Left => Vec2::new(-1.0, 0.0),
        Direction::Right => Vec2::new(1.0, 0.0),
    }
}

fn direction_for(key: InputKey) -> Direction {
    match key {
        InputKey::W => Direction::Up,
        InputKey::S => Direction::Down,
        InputKey::A => Direction::Left,
        InputKey::D => Direction::Right,
        _ => unreachable!("direction_for called with a non-movement key"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// E3: predicted move + reconcile ends at the server's echoed position
    /// with no pending inputs left over.
    #[test]
    fn e3_predict_then_reconcile_matches_server() {
        let mut local = LocalPlayer::new(1000, Vec2::ZERO, (1.0, 0.0, 0.0));
        assert!(local.apply_local(5, InputKey::W));
        assert_eq!(local.player.position, Vec2::new(0.0, 4.0));

        local.reconcile(&PlayerUpdateBody {
            seq_nr: 5,
            id: 1000,
            pos: [0.0, 4.0],
            direction: Direction::Up.to_wire() as u8,
            state: PlayerState::Walk.to_wire() as u8,
        });

        assert_eq!(local.player.position, Vec2::new(0.0, 4.0));
        assert_eq!(local.pending_len(), 0);
    }

    /// P5: prediction idempotence — replaying a remaining pending input
    /// after a reconcile lands on the same spot a continuous local
    /// simulation would have reached.
    #[test]
    fn p5_reconcile_replays_unacked_inputs() {
        let mut local = LocalPlayer::new(1000, Vec2::ZERO, (1.0, 0.0, 0.0));
        local.apply_local(1, InputKey::W);
        local.apply_local(2, InputKey::W);
        let predicted_after_both = local.player.position;

        // Echo only acks seq 1; seq 2 is still pending and must replay.
        local.reconcile(&PlayerUpdateBody {
            seq_nr: 1,
            id: 1000,
            pos: [0.0, 4.0],
            direction: Direction::Up.to_wire() as u8,
            state: PlayerState::Walk.to_wire() as u8,
        });

        assert_eq!(local.player.position, predicted_after_both);
        assert_eq!(local.pending_len(), 1);
    }

    /// E6: a Roll echo re-initializes the local roll animation from the
    /// server's `roll_start`, not the locally-predicted teleport end.
    #[test]
    fn e6_roll_echo_resets_local_animation() {
        let mut local = LocalPlayer::new(1000, Vec2::new(0.0, 100.0), (1.0, 0.0, 0.0));
        local.player.direction = Direction::Up;
        local.apply_local(1, InputKey::LeftShift);
        assert_eq!(local.player.position, Vec2::new(0.0, 100.0 + PLAYER_ROLL_DISTANCE));

        local.reconcile(&PlayerUpdateBody {
            seq_nr: 1,
            id: 1000,
            pos: [0.0, 100.0],
            direction: Direction::Up.to_wire() as u8,
            state: PlayerState::Roll.to_wire() as u8,
        });

        assert_eq!(local.player.roll_start, 100.0);
        assert_eq!(local.player.state, PlayerState::Roll);
    }

    #[test]
    fn roll_on_cooldown_is_rejected_locally() {
        let mut local = LocalPlayer::new(1000, Vec2::ZERO, (1.0, 0.0, 0.0));
        assert!(local.apply_local(1, InputKey::LeftShift));
        assert!(!local.apply_local(2, InputKey::LeftShift));
        assert_eq!(local.pending_len(), 1);
    }

    #[test]
    fn abandons_reconcile_when_seq_nr_not_pending() {
        let mut local = LocalPlayer::new(1000, Vec2::ZERO, (1.0, 0.0, 0.0));
        local.apply_local(1, InputKey::W);
        local.reconcile(&PlayerUpdateBody {
            seq_nr: 999,
            id: 1000,
            pos: [0.0, 0.0],
            direction: Direction::Down.to_wire() as u8,
            state: PlayerState::Idle.to_wire() as u8,
        });
        // Position untouched since the echo was abandoned, pending drained
        // by the failed search (matches popping-until-match-or-empty).
        assert_eq!(local.player.position, Vec2::new(0.0, 4.0));
        assert_eq!(local.pending_len(), 0);
    }
}
