//! Bounded history of received snapshots

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::game::snapshot::WorldSnapshot;

use super::interpolation::{self, RenderState, TimedSnapshot};

/// Maximum number of snapshots kept; oldest are dropped first
pub const HISTORY_CAPACITY: usize = 120;

/// Snapshot history shared between the network reader and the frame loop
pub struct SnapshotBuffer {
    history: Mutex<VecDeque<TimedSnapshot>>,
    /// Seconds subtracted from local time before sampling the history
    interpolation_delay: f64,
}

impl SnapshotBuffer {
    pub fn new(interpolation_delay: f64) -> Self {
        Self {
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY + 1)),
            interpolation_delay: interpolation_delay.max(0.0),
        }
    }

    /// Stamp a snapshot with its receipt time and append it
    pub fn on_snapshot_received(&self, snapshot: WorldSnapshot, now: f64) {
        let mut history = self.history.lock();
        history.push_back(TimedSnapshot {
            snapshot,
            received_at: now,
        });
        while history.len() > HISTORY_CAPACITY {
            history.pop_front();
        }
    }

    /// Render state at local time `now`; `None` until a snapshot has arrived
    pub fn compute_render_state(&self, now: f64, local_slot: usize) -> Option<RenderState> {
        let history = self.history.lock();
        interpolation::render_state(&history, now, self.interpolation_delay, local_slot)
    }

    /// Most recently received snapshot
    pub fn latest(&self) -> Option<WorldSnapshot> {
        self.history.lock().back().map(|entry| entry.snapshot.clone())
    }

    /// Oldest retained snapshot
    #[cfg(test)]
    pub fn oldest(&self) -> Option<WorldSnapshot> {
        self.history.lock().front().map(|entry| entry.snapshot.clone())
    }

    /// Whether a snapshot with this tick is still retained
    #[cfg(test)]
    pub fn contains_tick(&self, tick: u64) -> bool {
        self.history.lock().iter().any(|entry| entry.snapshot.tick == tick)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::Vec2;
    use crate::game::snapshot::ParticipantSnapshot;
    use crate::game::state::Pickup;

    fn snapshot(tick: u64, remote_x: f32) -> WorldSnapshot {
        WorldSnapshot {
            tick,
            server_time: tick as f64 / 30.0,
            participants: [
                ParticipantSnapshot {
                    position: Vec2::new(200.0, 300.0),
                    score: 0,
                },
                ParticipantSnapshot {
                    position: Vec2::new(remote_x, 300.0),
                    score: 0,
                },
            ],
            pickup: Pickup {
                position: Vec2::new(400.0, 300.0),
                active: true,
            },
        }
    }

    #[test]
    fn history_is_capped_with_oldest_first_eviction() {
        let buffer = SnapshotBuffer::new(0.1);
        for tick in 1..=120 {
            buffer.on_snapshot_received(snapshot(tick, 0.0), tick as f64);
        }
        assert_eq!(buffer.len(), 120);
        assert!(buffer.contains_tick(1));

        buffer.on_snapshot_received(snapshot(121, 0.0), 121.0);
        assert_eq!(buffer.len(), 120);
        assert!(!buffer.contains_tick(1));
        assert!(buffer.contains_tick(2));
        assert_eq!(buffer.oldest().map(|s| s.tick), Some(2));
        assert_eq!(buffer.latest().map(|s| s.tick), Some(121));

        for tick in 122..400 {
            buffer.on_snapshot_received(snapshot(tick, 0.0), tick as f64);
            assert!(buffer.len() <= HISTORY_CAPACITY);
        }
    }

    #[test]
    fn not_ready_until_first_snapshot() {
        let buffer = SnapshotBuffer::new(0.1);
        assert!(buffer.is_empty());
        assert!(buffer.compute_render_state(1.0, 0).is_none());
        assert!(buffer.latest().is_none());
    }

    #[test]
    fn renders_remote_between_snapshots() {
        let buffer = SnapshotBuffer::new(0.1);
        buffer.on_snapshot_received(snapshot(0, 100.0), 0.0);
        buffer.on_snapshot_received(snapshot(3, 120.0), 0.1);

        let state = buffer.compute_render_state(0.15, 0).unwrap();
        assert!((state.remote_position.x - 110.0).abs() < 1e-3);
        assert!((0.0..=1.0).contains(&state.fraction));
    }

    #[test]
    fn reader_and_writer_threads_share_history() {
        use std::sync::Arc;

        let buffer = Arc::new(SnapshotBuffer::new(0.1));
        let writer = {
            let buffer = buffer.clone();
            std::thread::spawn(move || {
                for tick in 0..500 {
                    buffer.on_snapshot_received(snapshot(tick, tick as f32), tick as f64 * 0.01);
                }
            })
        };
        for i in 0..500 {
            if let Some(state) = buffer.compute_render_state(i as f64 * 0.01, 0) {
                assert!((0.0..=1.0).contains(&state.fraction));
            }
        }
        writer.join().unwrap();
        assert_eq!(buffer.len(), HISTORY_CAPACITY);
    }
}
