//! Arena client: connects, predicts the local participant, interpolates the
//! remote one and presents frames at a fixed rate.
//!
//! Directions are read from stdin, one per line: `w`/`a`/`s`/`d` to move,
//! `x` to stop, or `<dx> <dy>` with each component in -1..=1.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use arena_sync::client::{connect, parse_intent, ClientRuntime, SnapshotBuffer, TracingSink};
use arena_sync::config::ClientConfig;
use arena_sync::game::Direction;
use arena_sync::util::telemetry::{init_tracing, shutdown_signal};
use arena_sync::util::time::{init_clock, millis_to_secs};

/// Seconds between frame log lines
const FRAME_LOG_INTERVAL: f64 = 1.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env()?;
    init_tracing(&config.log_level, config.log_format);
    init_clock();

    info!(
        server = %config.server_addr,
        name = %config.player_name,
        interpolation_delay_ms = config.interpolation_delay_ms,
        reconcile = config.reconciliation.enabled,
        "Starting arena client"
    );

    let buffer = Arc::new(SnapshotBuffer::new(millis_to_secs(config.interpolation_delay_ms)));
    let connection = connect(&config, buffer.clone()).await?;

    let (intent_tx, intent_rx) = mpsc::channel::<Direction>(16);
    tokio::spawn(read_intents(intent_tx));

    let running = Arc::new(AtomicBool::new(true));
    let shutdown_flag = running.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_flag.store(false, Ordering::Release);
    });

    let runtime = ClientRuntime::new(
        connection.slot,
        buffer,
        config.reconciliation,
        connection.outbound,
        TracingSink::new(FRAME_LOG_INTERVAL),
    );
    runtime
        .run(intent_rx, config.frame_rate, connection.connected, running)
        .await;

    info!("Client shutdown complete");
    Ok(())
}

/// Forward stdin direction commands to the frame loop
async fn read_intents(tx: mpsc::Sender<Direction>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_intent(&line) {
                Some(direction) => {
                    if tx.send(direction).await.is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => warn!(input = %line.trim(), "Unrecognized direction"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
}
