//! Accepting the two participants

use std::sync::atomic::Ordering;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::game::state::PARTICIPANT_SLOTS;

use super::broadcast::Broadcaster;
use super::session::spawn_session;

/// Accept exactly one connection per slot, in order, and wire each into the
/// broadcaster. Failed accepts are retried for the same slot.
pub async fn accept_participants(listener: &TcpListener, state: &AppState) -> Broadcaster {
    let mut broadcaster = Broadcaster::new();

    for slot in 0..PARTICIPANT_SLOTS {
        info!(participant = slot + 1, "Waiting for participant to connect");

        let (stream, addr) = loop {
            match listener.accept().await {
                Ok(accepted) => break accepted,
                Err(e) => error!(error = %e, "accept() failed, retrying"),
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            warn!(participant = slot + 1, error = %e, "Failed to set TCP_NODELAY");
        }
        info!(participant = slot + 1, peer = %addr, "Participant connected");

        let handle = spawn_session(
            stream,
            slot,
            state.input_queue.clone(),
            state.running.clone(),
            state.config.outbound_queue,
        );
        broadcaster.attach(slot, handle.connected, handle.outbound);
    }

    info!("Both participants connected");
    broadcaster
}

/// Close every further connection; slots are never reassigned within a run
pub async fn reject_late_joiners(listener: TcpListener, state: AppState) {
    while state.running.load(Ordering::Acquire) {
        match listener.accept().await {
            Ok((stream, addr)) => {
                warn!(peer = %addr, "Arena full, closing connection");
                drop(stream);
            }
            Err(e) => warn!(error = %e, "accept() failed"),
        }
    }
}
