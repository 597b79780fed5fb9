//! Authoritative fixed-tick simulation loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::net::broadcast::Broadcaster;
use crate::util::time::{monotonic_secs, tick_delta, tick_duration};

use super::input_queue::InputQueue;
use super::physics::PhysicsSystem;
use super::snapshot::{SnapshotBuilder, WorldSnapshot};
use super::state::WorldState;
use super::InputEvent;

/// The authoritative simulation.
///
/// Sole owner of the world state. Inputs come in through the shared
/// [`InputQueue`], snapshots go out through the [`Broadcaster`].
pub struct Simulator {
    state: WorldState,
    input_queue: Arc<InputQueue>,
    broadcaster: Broadcaster,
    snapshot_builder: SnapshotBuilder,
    running: Arc<AtomicBool>,
}

impl Simulator {
    pub fn new(
        state: WorldState,
        input_queue: Arc<InputQueue>,
        broadcaster: Broadcaster,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            state,
            input_queue,
            broadcaster,
            snapshot_builder: SnapshotBuilder::new(),
            running,
        }
    }

    /// Run the authoritative tick loop until the running flag is cleared.
    ///
    /// Tick boundaries are `start + n * period`. A tick that runs long is
    /// followed by immediate catch-up ticks rather than a shifted schedule.
    pub async fn run(mut self) -> Broadcaster {
        info!(
            pickup_x = self.state.pickup.position.x,
            pickup_y = self.state.pickup.position.y,
            "Simulation started"
        );

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        while self.running.load(Ordering::Acquire) {
            tick_interval.tick().await;

            let snapshot = self.step(monotonic_secs());
            self.broadcaster.broadcast(&snapshot);
        }

        let stats = self.broadcaster.stats();
        info!(
            ticks = self.state.tick,
            snapshots = stats.total_snapshots,
            bytes = stats.total_bytes,
            scores = ?self.state.participants.iter().map(|p| p.score).collect::<Vec<_>>(),
            "Simulation stopped"
        );
        self.broadcaster
    }

    /// Run one simulation tick at server time `now` and return its snapshot
    pub fn step(&mut self, now: f64) -> WorldSnapshot {
        for event in self.input_queue.drain_ready(now) {
            self.apply_input(&event);
        }

        self.update_physics(tick_delta());
        self.update_pickup();

        let snapshot = self.snapshot_builder.build(&self.state, now);
        self.state.tick += 1;
        snapshot
    }

    /// Overwrite the target's velocity; the last input applied in a tick wins
    fn apply_input(&mut self, event: &InputEvent) {
        let speed = self.state.params.speed;
        if let Some(participant) = self.state.participant_mut(event.slot) {
            participant.apply_direction(event.direction, speed);
            debug!(
                participant = participant.id,
                seq = event.seq,
                dx = event.direction.dx,
                dy = event.direction.dy,
                "Applied input"
            );
        }
    }

    /// Integrate both participants, then separate them if they overlap
    fn update_physics(&mut self, dt: f32) {
        let params = self.state.params;
        for participant in self.state.participants.iter_mut() {
            participant.position =
                PhysicsSystem::integrate(participant.position, participant.velocity, dt, &params);
        }

        let [a, b] = &mut self.state.participants;
        let (pa, pb) = PhysicsSystem::resolve_participant_overlap(a.position, b.position, &params);
        // Separation can push a body against a wall past its radius margin
        a.position = PhysicsSystem::clamp_to_bounds(pa, &params);
        b.position = PhysicsSystem::clamp_to_bounds(pb, &params);
    }

    /// Respawn an inactive pickup, then test participants in slot order
    fn update_pickup(&mut self) {
        if !self.state.pickup.active {
            self.state.respawn_pickup();
            debug!(
                x = self.state.pickup.position.x,
                y = self.state.pickup.position.y,
                "Spawned pickup"
            );
        }

        let params = self.state.params;
        let pickup = self.state.pickup.position;
        let tick = self.state.tick;

        for participant in self.state.participants.iter_mut() {
            if PhysicsSystem::pickup_test(participant.position, pickup, &params) {
                participant.score += 1;
                self.state.pickup.active = false;
                info!(
                    participant = participant.id,
                    score = participant.score,
                    tick,
                    "Participant collected pickup"
                );
                break;
            }
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    #[cfg(test)]
    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }
}
