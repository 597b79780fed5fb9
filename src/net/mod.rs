//! Line protocol, server sessions and snapshot fan-out

pub mod broadcast;
pub mod listener;
pub mod protocol;
pub mod session;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use protocol::{ClientMsg, ProtocolError, ServerMsg};
pub use session::SessionError;
