//! Snapshot building

use super::physics::Vec2;
use super::state::{Pickup, WorldState, PARTICIPANT_SLOTS};

/// One participant as seen in a snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticipantSnapshot {
    pub position: Vec2,
    pub score: u32,
}

/// Immutable copy of the whole world at one tick
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    pub tick: u64,
    /// Server monotonic clock, seconds
    pub server_time: f64,
    pub participants: [ParticipantSnapshot; PARTICIPANT_SLOTS],
    pub pickup: Pickup,
}

impl WorldSnapshot {
    pub fn scores(&self) -> [u32; PARTICIPANT_SLOTS] {
        [self.participants[0].score, self.participants[1].score]
    }
}

/// Builds snapshots for network transmission
#[derive(Default)]
pub struct SnapshotBuilder {
    last_tick: Option<u64>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot of the current world state
    pub fn build(&mut self, state: &WorldState, server_time: f64) -> WorldSnapshot {
        debug_assert!(
            self.last_tick.map_or(true, |last| state.tick > last),
            "snapshot ticks must be strictly increasing"
        );
        self.last_tick = Some(state.tick);

        WorldSnapshot {
            tick: state.tick,
            server_time,
            participants: state.participants.clone().map(|p| ParticipantSnapshot {
                position: p.position,
                score: p.score,
            }),
            pickup: state.pickup,
        }
    }
}

/// Snapshot traffic stats for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_recipients_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, recipients: usize, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += (bytes * recipients) as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_recipients_per_snapshot =
            self.avg_recipients_per_snapshot * ((n - 1.0) / n) + (recipients as f32 / n);
    }
}
