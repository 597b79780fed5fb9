//! Time-shifted interpolation of the remote participant
//!
//! The remote body is drawn `interpolation_delay` seconds in the past, between
//! the two buffered snapshots whose receipt times bracket that instant. Discrete
//! state (pickup, scores) is taken from the newest snapshot so that changes show
//! up without delay.

use std::collections::VecDeque;

use crate::game::physics::Vec2;
use crate::game::snapshot::WorldSnapshot;
use crate::game::state::{Pickup, PARTICIPANT_SLOTS};

/// A received snapshot stamped with the local receipt time
#[derive(Debug, Clone, PartialEq)]
pub struct TimedSnapshot {
    pub snapshot: WorldSnapshot,
    /// Client monotonic clock, seconds
    pub received_at: f64,
}

/// What the render collaborator needs for one frame, apart from the local body
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    /// Tick of the newest snapshot
    pub tick: u64,
    pub remote_slot: usize,
    pub remote_position: Vec2,
    /// Interpolation fraction used between the two endpoints, in `[0, 1]`
    pub fraction: f32,
    pub pickup: Pickup,
    pub scores: [u32; PARTICIPANT_SLOTS],
}

/// Pick the two history entries to interpolate between.
///
/// Returns the first consecutive pair whose later entry was received at or
/// after `t_render`. If render time has outrun the buffer, the two newest
/// entries are used; with a single entry both endpoints are that entry.
pub fn endpoints(history: &VecDeque<TimedSnapshot>, t_render: f64) -> Option<(&TimedSnapshot, &TimedSnapshot)> {
    let newest = history.back()?;
    if history.len() < 2 {
        return Some((newest, newest));
    }

    let found = (1..history.len()).find(|&i| history[i].received_at >= t_render);
    let i = found.unwrap_or(history.len() - 1);
    Some((&history[i - 1], &history[i]))
}

/// Fraction of the way from `a` to `b` at `t_render`, clamped to `[0, 1]`
pub fn fraction(a: f64, b: f64, t_render: f64) -> f32 {
    let span = b - a;
    if span <= 0.0 {
        return 0.0;
    }
    ((t_render - a) / span).clamp(0.0, 1.0) as f32
}

/// Render state at local time `now`, or `None` before the first snapshot
pub fn render_state(
    history: &VecDeque<TimedSnapshot>,
    now: f64,
    interpolation_delay: f64,
    local_slot: usize,
) -> Option<RenderState> {
    let t_render = now - interpolation_delay;
    let (a, b) = endpoints(history, t_render)?;
    let newest = &history.back()?.snapshot;

    let remote_slot = (local_slot + 1) % PARTICIPANT_SLOTS;
    let t = fraction(a.received_at, b.received_at, t_render);
    let from = a.snapshot.participants[remote_slot].position;
    let to = b.snapshot.participants[remote_slot].position;

    Some(RenderState {
        tick: newest.tick,
        remote_slot,
        remote_position: from.lerp(to, t),
        fraction: t,
        pickup: newest.pickup,
        scores: newest.scores(),
    })
}
