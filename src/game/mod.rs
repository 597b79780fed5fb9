//! Game simulation modules

pub mod input_queue;
pub mod physics;
pub mod simulation;
pub mod snapshot;
pub mod state;

pub use input_queue::InputQueue;
pub use physics::{ArenaParams, Direction, PhysicsSystem, Vec2};
pub use simulation::Simulator;
pub use snapshot::{ParticipantSnapshot, WorldSnapshot};
pub use state::{Participant, Pickup, WorldState, PARTICIPANT_SLOTS};

/// Directional input received from a participant, waiting in the input queue
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    /// Participant slot (0 or 1)
    pub slot: usize,
    /// Client-assigned sequence number; informational only
    pub seq: i32,
    pub direction: Direction,
    /// Earliest server time at which the simulator may apply this input
    pub ready_at: f64,
}
