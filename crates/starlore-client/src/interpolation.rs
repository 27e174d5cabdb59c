//! Remote player snapshot interpolation (spec §4.9, component C11),
//! converted from the render-side player loop in
//! `original_source/src/client/player.c`.
//!
//! Non-local players are rendered at a linear blend between the last two
//! authoritative snapshots rather than snapped directly to the latest one,
//! so they move smoothly between the server's 64Hz updates even though the
//! client may render faster or slower. Roll is a deliberate exception: the
//! server only emits one update at roll initiation (spec §9), so the
//! client must derive the in-flight roll position itself using the same
//! deterministic easing the server would have used.

use starlore_common::consts::{
    CLIENT_TICK_DURATION, PLAYER_ATTACK_DURATION, PLAYER_ROLL_DISTANCE, PLAYER_ROLL_DURATION, SERVER_TICK_RATE,
};
use starlore_common::math::{lerp, lerp_vec2, Vec2};
use starlore_common::packet::PlayerUpdateBody;
use starlore_common::player::{Direction, Player, PlayerId, PlayerState};

pub struct RemotePlayer {
    pub player: Player,
    last_position: Vec2,
    time_since_update: f32,
}

impl RemotePlayer {
    pub fn new(id: PlayerId, position: Vec2, color: (f32, f32, f32)) -> Self {
        RemotePlayer { player: Player::new(id, position, color), last_position: position, time_since_update: 0.0 }
    }

    /// Records a fresh `PlayerUpdate` snapshot as the new interpolation
    /// target (spec §4.9). For a Roll-initiation update the position IS
    /// `roll_start` on the rolling axis (spec §4.6 step 3), so `roll_start`
    /// is re-seeded from it and the roll accumulator restarts from zero —
    /// this is what lets a Roll echo re-animate a roll already predicted
    /// locally (spec §4.8).
    pub fn apply_snapshot(&mut self, update: &PlayerUpdateBody) {
        self.last_position = self.player.position;
        self.player.position = Vec2::new(update.pos[0], update.pos[1]);
        if let Some(direction) = Direction::from_wire(update.direction as u32) {
            self.player.direction = direction;
        }
        if let Some(state) = PlayerState::from_wire(update.state as u32) {
            if state == PlayerState::Roll {
                let dir = direction_vector(self.player.direction);
                self.player.roll_start = if dir.x != 0.0 { self.player.position.x } else { self.player.position.y };
                self.player.roll_accumulator = 0.0;
            }
            self.player.state = state;
        }
        self.player.last_seq_nr = update.seq_nr;
        self.time_since_update = 0.0;
    }

    /// Advances local animation clocks and applies the forced-idle timeout
    /// (spec §4.9): a remote player with no update for longer than its
    /// current action's duration snaps back to Idle so a disconnected peer
    /// (or a dropped update) never leaves a player stuck mid-animation.
    pub fn advance(&mut self, dt: f32) {
        self.time_since_update += dt;
        match self.player.state {
            PlayerState::Attack => {
                self.player.attack_accumulator += dt;
                if self.time_since_update > PLAYER_ATTACK_DURATION {
                    self.player.state = PlayerState::Idle;
                }
            }
            PlayerState::Roll => {
                self.player.roll_accumulator += dt;
                if self.time_since_update > PLAYER_ROLL_DURATION {
                    self.player.state = PlayerState::Idle;
                }
            }
            _ => {
                if self.time_since_update > CLIENT_TICK_DURATION {
                    self.player.state = PlayerState::Idle;
                }
            }
        }
    }

    /// The position to render this frame (spec §4.9).
    pub fn render_position(&self) -> Vec2 {
        if self.player.state == PlayerState::Roll {
            let dir = direction_vector(self.player.direction);
            let sign = dir.x + dir.y;
            let end = self.player.roll_start + sign * PLAYER_ROLL_DISTANCE;
            let t = self.player.roll_accumulator / PLAYER_ROLL_DURATION;
            let axis_value = lerp(self.player.roll_start, end, t);
            if dir.x != 0.0 {
                Vec2::new(axis_value, self.player.position.y)
            } else {
                Vec2::new(self.player.position.x, axis_value)
            }
        } else {
            let t = self.time_since_update * SERVER_TICK_RATE;
            lerp_vec2(self.last_position, self.player.position, t)
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blends_between_last_two_snapshots() {
        let mut remote = RemotePlayer::new(1001, Vec2::ZERO, (0.0, 1.0, 0.0));
        remote.apply_snapshot(&PlayerUpdateBody {
            seq_nr: 0,
            id: 1001,
            pos: [10.0, 0.0],
            direction: Direction::Right.to_wire() as u8,
            state: PlayerState::Walk.to_wire() as u8,
        });

        // Halfway to the next server tick.
        remote.advance(0.5 / SERVER_TICK_RATE);
        let mid = remote.render_position();
        assert!(mid.x > 0.0 && mid.x < 10.0);

        remote.advance(10.0);
        assert_eq!(remote.render_position(), Vec2::new(10.0, 0.0));
    }

    /// E6: a Roll echo re-animates from `roll_start`, never snapping
    /// straight to the post-roll position.
    #[test]
    fn e6_roll_echo_eases_instead_of_teleporting() {
        let mut remote = RemotePlayer::new(1001, Vec2::new(0.0, 0.0), (0.0, 1.0, 0.0));
        remote.player.direction = Direction::Up;
        remote.apply_snapshot(&PlayerUpdateBody {
            seq_nr: 1,
            id: 1001,
            pos: [0.0, 100.0],
            direction: Direction::Up.to_wire() as u8,
            state: PlayerState::Roll.to_wire() as u8,
        });
        assert_eq!(remote.player.roll_start, 100.0);

        remote.advance(PLAYER_ROLL_DURATION / 2.0);
        let mid = remote.render_position();
        assert!(mid.y > 100.0 && mid.y < 100.0 + PLAYER_ROLL_DISTANCE);

        remote.advance(PLAYER_ROLL_DURATION / 2.0 + 0.001);
        let end = remote.render_position();
        assert!((end.y - (100.0 + PLAYER_ROLL_DISTANCE)).abs() < 0.01);
    }

    #[test]
    fn forces_idle_after_attack_duration_elapses_without_update() {
        let mut remote = RemotePlayer::new(1001, Vec2::ZERO, (0.0, 1.0, 0.0));
        remote.apply_snapshot(&PlayerUpdateBody {
            seq_nr: 0,
            id: 1001,
            pos: [0.0, 0.0],
            direction: Direction::Down.to_wire() as u8,
            state: PlayerState::Attack.to_wire() as u8,
        });
        remote.advance(PLAYER_ATTACK_DURATION + 0.01);
        assert_eq!(remote.player.state, PlayerState::Idle);
    }

    #[test]
    fn forces_idle_after_one_frame_for_non_attack_non_roll_state() {
        let mut remote = RemotePlayer::new(1001, Vec2::ZERO, (0.0, 1.0, 0.0));
        remote.apply_snapshot(&PlayerUpdateBody {
            seq_nr: 0,
            id: 1001,
            pos: [4.0, 0.0],
            direction: Direction::Right.to_wire() as u8,
            state: PlayerState::Walk.to_wire() as u8,
        });
        remote.advance(CLIENT_TICK_DURATION + 0.001);
        assert_eq!(remote.player.state, PlayerState::Idle);
    }
}
