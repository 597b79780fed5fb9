//! Authoritative world state (owned by the simulation task)

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::physics::{ArenaParams, Direction, Vec2};

/// Number of participant slots in a session
pub const PARTICIPANT_SLOTS: usize = 2;

/// Participant state (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Wire identity, 1 or 2
    pub id: u8,
    pub position: Vec2,
    /// Derived from the latest applied input
    pub velocity: Vec2,
    pub score: u32,
}

impl Participant {
    pub fn new(id: u8, position: Vec2) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            score: 0,
        }
    }

    /// Overwrite velocity from a directional intent
    pub fn apply_direction(&mut self, direction: Direction, speed: f32) {
        self.velocity = direction.velocity(speed);
    }
}

/// The respawning pickup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pickup {
    pub position: Vec2,
    pub active: bool,
}

/// World state: two participant slots, one pickup, tick counter and RNG
pub struct WorldState {
    pub params: ArenaParams,
    pub tick: u64,
    pub participants: [Participant; PARTICIPANT_SLOTS],
    pub pickup: Pickup,
    pub rng: ChaCha8Rng,
}

impl WorldState {
    /// Fresh world with both participants at their spawn points and an active pickup
    pub fn new(params: ArenaParams, seed: u64) -> Self {
        let [left, right] = params.spawn_positions();
        let mut state = Self {
            params,
            tick: 0,
            participants: [Participant::new(1, left), Participant::new(2, right)],
            pickup: Pickup {
                position: Vec2::ZERO,
                active: false,
            },
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        state.respawn_pickup();
        state
    }

    /// Place the pickup at a uniformly random in-bounds position and activate it
    pub fn respawn_pickup(&mut self) {
        let margin = self.params.pickup_radius;
        let x = self.rng.gen_range(margin..=self.params.width - margin);
        let y = self.rng.gen_range(margin..=self.params.height - margin);
        self.pickup = Pickup {
            position: Vec2::new(x, y),
            active: true,
        };
    }

    #[cfg(test)]
    pub fn participant(&self, slot: usize) -> Option<&Participant> {
        self.participants.get(slot)
    }

    pub fn participant_mut(&mut self, slot: usize) -> Option<&mut Participant> {
        self.participants.get_mut(slot)
    }
}
