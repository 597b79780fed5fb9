//! Per-participant server session: line reader feeding the input queue and a
//! writer draining the participant's outbound queue

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::game::input_queue::InputQueue;
use crate::util::rate_limit::{LogThrottle, UNKNOWN_MESSAGE_LOG_RATE};
use crate::util::time::monotonic_secs;

use super::broadcast::OutboundLine;
use super::protocol::{line_text, ClientMsg, ProtocolError, ServerMsg};

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed by peer")]
    Closed,

    #[error("Unexpected handshake line: {0}")]
    Handshake(String),
}

/// Why a reader loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    PeerClosed,
    ReadError,
    Shutdown,
}

/// What happened to a single inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Input admitted to the queue, applicable from `ready_at`
    Admitted { seq: i32, ready_at: f64 },
    Joined,
    Ignored,
}

/// Everything the reader of one participant touches
pub struct SessionContext {
    /// Slot index (0 or 1); the participant number on the wire is `slot + 1`
    pub slot: usize,
    pub input_queue: Arc<InputQueue>,
    /// Cleared when this session ends; consulted by the broadcaster
    pub connected: Arc<AtomicBool>,
    pub running: Arc<AtomicBool>,
}

impl SessionContext {
    fn participant(&self) -> usize {
        self.slot + 1
    }
}

/// Handles returned to the listener for one spawned session
pub struct SessionHandle {
    pub connected: Arc<AtomicBool>,
    pub outbound: mpsc::Sender<OutboundLine>,
}

/// Spawn the reader and writer tasks for an accepted connection.
///
/// WELCOME is queued before anything else, so it is always the first line the
/// participant receives.
pub fn spawn_session(
    stream: TcpStream,
    slot: usize,
    input_queue: Arc<InputQueue>,
    running: Arc<AtomicBool>,
    outbound_capacity: usize,
) -> SessionHandle {
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<OutboundLine>(outbound_capacity);
    let connected = Arc::new(AtomicBool::new(true));

    let welcome: OutboundLine = ServerMsg::Welcome {
        participant: (slot + 1) as u8,
    }
    .encode()
    .into();
    if outbound_tx.try_send(welcome).is_err() {
        warn!(participant = slot + 1, "Failed to queue WELCOME");
    }

    tokio::spawn(async move {
        if let Err(e) = write_lines(write_half, outbound_rx).await {
            debug!(participant = slot + 1, error = %e, "Writer stopped");
        }
    });

    let ctx = SessionContext {
        slot,
        input_queue,
        connected: connected.clone(),
        running,
    };
    tokio::spawn(async move {
        let end = read_lines(read_half, &ctx).await;
        info!(participant = ctx.participant(), reason = ?end, "Session ended");
    });

    SessionHandle {
        connected,
        outbound: outbound_tx,
    }
}

/// Reader loop: decode lines and admit inputs until the peer goes away.
///
/// Always clears the connectivity flag before returning. The slot's game state
/// is left as it is.
pub async fn read_lines<R: AsyncRead + Unpin>(reader: R, ctx: &SessionContext) -> SessionEnd {
    info!(participant = ctx.participant(), "Session started");

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut unknown = LogThrottle::new(UNKNOWN_MESSAGE_LOG_RATE);

    let end = loop {
        if !ctx.running.load(Ordering::Acquire) {
            break SessionEnd::Shutdown;
        }

        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!(participant = ctx.participant(), "Participant disconnected");
                break SessionEnd::PeerClosed;
            }
            Ok(_) => match line_text(&buf) {
                Ok(line) => {
                    handle_line(line, ctx, monotonic_secs(), &mut unknown);
                }
                Err(e) => {
                    debug!(participant = ctx.participant(), error = %e, "Dropping malformed message");
                }
            },
            Err(e) => {
                warn!(participant = ctx.participant(), error = %e, "Read error");
                break SessionEnd::ReadError;
            }
        }
    };

    ctx.connected.store(false, Ordering::Release);
    end
}

/// Decode one line received at server time `now` and act on it
pub fn handle_line(
    line: &str,
    ctx: &SessionContext,
    now: f64,
    unknown: &mut LogThrottle,
) -> LineOutcome {
    match ClientMsg::decode(line) {
        Ok(ClientMsg::Input { seq, direction }) => {
            let ready_at = ctx.input_queue.admit(ctx.slot, seq, direction, now);
            debug!(participant = ctx.participant(), seq, ready_at, "Input admitted");
            LineOutcome::Admitted { seq, ready_at }
        }
        Ok(ClientMsg::Join { name }) => {
            info!(participant = ctx.participant(), name = %name, "Participant sent JOIN");
            LineOutcome::Joined
        }
        Err(ProtocolError::Empty) => LineOutcome::Ignored,
        Err(ProtocolError::Unknown(tag)) => {
            if let Some(suppressed) = unknown.check() {
                warn!(
                    participant = ctx.participant(),
                    tag = %tag,
                    suppressed,
                    "Unknown message, ignoring"
                );
            }
            LineOutcome::Ignored
        }
        Err(e @ ProtocolError::Malformed(_)) => {
            debug!(participant = ctx.participant(), error = %e, "Dropping malformed message");
            LineOutcome::Ignored
        }
    }
}

/// Writer loop: one line per outbound message, newline terminated
pub async fn write_lines<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut outbound: mpsc::Receiver<OutboundLine>,
) -> Result<(), SessionError> {
    while let Some(line) = outbound.recv().await {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        writer.write_all(&buf).await?;
    }
    writer.shutdown().await.ok();
    Ok(())
}
