//! Participant client: snapshot history, remote interpolation, local
//! prediction and the frame loop tying them together

pub mod interpolation;
pub mod prediction;
pub mod runtime;
pub mod session;
pub mod snapshot_buffer;

pub use interpolation::{RenderState, TimedSnapshot};
pub use prediction::{LocalPredictor, ReconcileSettings};
pub use runtime::{parse_intent, ClientRuntime, Frame, FrameSink, TracingSink};
pub use session::{connect, ClientConnection};
pub use snapshot_buffer::SnapshotBuffer;
