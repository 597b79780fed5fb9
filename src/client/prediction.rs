//! Client-side prediction of the local participant
//!
//! The local body is dead-reckoned from the last known velocity, using the
//! same integration and clamping as the server. Key changes take effect on
//! screen immediately and are sent to the server as `INPUT` messages.
//!
//! Reconciliation toward the authoritative position exists but is off by
//! default: with it off the local body feels instant, at the cost of drift
//! from the server's view that is never corrected.

use tracing::debug;

use crate::game::physics::{ArenaParams, Direction, PhysicsSystem, Vec2};
use crate::game::snapshot::WorldSnapshot;
use crate::net::protocol::ClientMsg;

/// Longest time step applied in one frame, bounding the jump after a stall
pub const MAX_FRAME_STEP: f32 = 0.1;

/// Reconciliation toggle and tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileSettings {
    pub enabled: bool,
    /// Errors larger than this snap straight to the authoritative position
    pub snap_distance: f32,
    /// Fraction of a smaller error removed per authoritative update
    pub blend: f32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            snap_distance: 100.0,
            blend: 0.1,
        }
    }
}

/// Predicted local body
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PredictedState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub initialized: bool,
}

/// What an authoritative update did to the prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// First snapshot: prediction seeded
    Seeded,
    /// Nothing changed (reconciliation off, already seen, or no error)
    None,
    Snapped { error: f32 },
    Blended { error: f32 },
}

/// Local participant predictor, owned by the client frame loop
pub struct LocalPredictor {
    params: ArenaParams,
    settings: ReconcileSettings,
    state: PredictedState,
    intent: Direction,
    next_seq: i32,
    last_tick: Option<u64>,
}

impl LocalPredictor {
    pub fn new(params: ArenaParams, settings: ReconcileSettings) -> Self {
        Self {
            params,
            settings,
            state: PredictedState::default(),
            intent: Direction::NONE,
            next_seq: 1,
            last_tick: None,
        }
    }

    pub fn state(&self) -> &PredictedState {
        &self.state
    }

    /// Feed the newest authoritative snapshot for our slot.
    ///
    /// The first call seeds the position. Velocity follows the current intent,
    /// which is zero unless a key went down before the first snapshot arrived.
    /// Later calls only matter when reconciliation is enabled, and each tick is
    /// considered once.
    pub fn observe(&mut self, snapshot: &WorldSnapshot, slot: usize) -> Correction {
        let Some(authoritative) = snapshot.participants.get(slot).map(|p| p.position) else {
            return Correction::None;
        };

        if !self.state.initialized {
            self.state = PredictedState {
                position: authoritative,
                velocity: self.intent.velocity(self.params.speed),
                initialized: true,
            };
            self.last_tick = Some(snapshot.tick);
            debug!(x = authoritative.x, y = authoritative.y, "Seeded local prediction");
            return Correction::Seeded;
        }

        if !self.settings.enabled || self.last_tick == Some(snapshot.tick) {
            return Correction::None;
        }
        self.last_tick = Some(snapshot.tick);
        self.reconcile(authoritative)
    }

    fn reconcile(&mut self, authoritative: Vec2) -> Correction {
        let error = self.state.position.distance(authoritative);
        if error > self.settings.snap_distance {
            self.state.position = authoritative;
            debug!(error, "Snapped local prediction");
            Correction::Snapped { error }
        } else if error > f32::EPSILON {
            self.state.position = self.state.position.lerp(authoritative, self.settings.blend);
            Correction::Blended { error }
        } else {
            Correction::None
        }
    }

    /// Advance the prediction by the wall-clock time since the previous frame
    pub fn advance(&mut self, elapsed: f32) {
        if !self.state.initialized {
            return;
        }
        let dt = elapsed.clamp(0.0, MAX_FRAME_STEP);
        self.state.position =
            PhysicsSystem::integrate(self.state.position, self.state.velocity, dt, &self.params);
    }

    /// The `INPUT` announcing a switch to `direction`, or `None` if the intent
    /// would not change. Nothing is applied until [`commit_intent`](Self::commit_intent).
    pub fn pending_input(&self, direction: Direction) -> Option<ClientMsg> {
        (direction != self.intent).then_some(ClientMsg::Input {
            seq: self.next_seq,
            direction,
        })
    }

    /// Apply a change of the directional keys once its `INPUT` has been queued
    pub fn commit_intent(&mut self, direction: Direction) {
        if direction == self.intent {
            return;
        }
        self.intent = direction;
        self.state.velocity = direction.velocity(self.params.speed);
        self.next_seq += 1;
    }
}
