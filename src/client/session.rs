//! Client connection: JOIN / WELCOME handshake, snapshot reader and input writer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::net::broadcast::OutboundLine;
use crate::net::protocol::{line_text, ClientMsg, ProtocolError, ServerMsg};
use crate::net::session::{write_lines, SessionEnd, SessionError};
use crate::util::rate_limit::{LogThrottle, UNKNOWN_MESSAGE_LOG_RATE};
use crate::util::time::monotonic_secs;

use super::snapshot_buffer::SnapshotBuffer;

/// Outbound queue capacity for client messages
const OUTBOUND_CAPACITY: usize = 64;

/// An established connection to the arena server
pub struct ClientConnection {
    /// Our slot index (participant number minus one)
    pub slot: usize,
    /// Lines to send to the server
    pub outbound: mpsc::Sender<OutboundLine>,
    /// Cleared when the snapshot reader stops
    pub connected: Arc<AtomicBool>,
}

/// Connect, announce ourselves, wait for the slot assignment and start the
/// background reader that fills `buffer`.
pub async fn connect(
    config: &ClientConfig,
    buffer: Arc<SnapshotBuffer>,
) -> Result<ClientConnection, SessionError> {
    let stream = TcpStream::connect(&config.server_addr).await?;
    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "Failed to set TCP_NODELAY");
    }
    info!(server = %config.server_addr, "Connected to server");

    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<OutboundLine>(OUTBOUND_CAPACITY);

    tokio::spawn(async move {
        if let Err(e) = write_lines(write_half, outbound_rx).await {
            warn!(error = %e, "Writer stopped");
        }
    });

    let join = ClientMsg::Join {
        name: config.player_name.clone(),
    };
    outbound_tx
        .send(join.encode().into())
        .await
        .map_err(|_| SessionError::Closed)?;

    let mut reader = BufReader::new(read_half);
    let participant = await_welcome(&mut reader).await?;
    let slot = usize::from(participant) - 1;
    info!(participant, "Joined arena");

    let connected = Arc::new(AtomicBool::new(true));
    let reader_connected = connected.clone();
    tokio::spawn(async move {
        let end = receive_snapshots(reader, &buffer, &reader_connected).await;
        info!(reason = ?end, "Snapshot reader stopped");
    });

    Ok(ClientConnection {
        slot,
        outbound: outbound_tx,
        connected,
    })
}

/// Read lines until WELCOME arrives; returns the participant number (1 or 2)
pub async fn await_welcome<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<u8, SessionError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Err(SessionError::Closed);
        }
        let line = match line_text(&buf) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Ignoring line during handshake");
                continue;
            }
        };
        match ServerMsg::decode(line) {
            Ok(ServerMsg::Welcome { participant }) => return Ok(participant),
            Ok(ServerMsg::State(_)) => debug!("STATE before WELCOME, ignoring"),
            Err(ProtocolError::Malformed("WELCOME")) => {
                return Err(SessionError::Handshake(line.to_string()));
            }
            Err(e) => warn!(error = %e, "Ignoring line during handshake"),
        }
    }
}

/// Reader loop: append every STATE to the buffer, stamped with local time.
///
/// Clears `connected` when the server goes away. Lines that fail to decode
/// are dropped without ending the loop.
pub async fn receive_snapshots<R: AsyncBufRead + Unpin>(
    mut reader: R,
    buffer: &SnapshotBuffer,
    connected: &AtomicBool,
) -> SessionEnd {
    let mut buf = Vec::new();
    let mut unknown = LogThrottle::new(UNKNOWN_MESSAGE_LOG_RATE);

    let end = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!("Server closed the connection");
                break SessionEnd::PeerClosed;
            }
            Ok(_) => match line_text(&buf).and_then(ServerMsg::decode) {
                Ok(ServerMsg::State(snapshot)) => {
                    buffer.on_snapshot_received(snapshot, monotonic_secs());
                }
                Ok(ServerMsg::Welcome { participant }) => {
                    warn!(participant, "Repeated WELCOME, ignoring");
                }
                Err(ProtocolError::Empty) => {}
                Err(ProtocolError::Unknown(tag)) => {
                    if let Some(suppressed) = unknown.check() {
                        warn!(tag = %tag, suppressed, "Unknown message, ignoring");
                    }
                }
                Err(e) => debug!(error = %e, "Dropping malformed message"),
            },
            Err(e) => {
                warn!(error = %e, "Read error");
                break SessionEnd::ReadError;
            }
        }
    };

    connected.store(false, Ordering::Release);
    end
}
