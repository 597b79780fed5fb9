//! Arena server: authoritative fixed-tick simulation for two participants
//!
//! Startup order:
//! - load configuration and initialize logging
//! - accept exactly two TCP connections, assigning slots in arrival order
//! - run the 30 Hz simulation, broadcasting a snapshot after every tick
//! - on Ctrl+C / SIGTERM clear the running flag and let every loop wind down

use std::sync::atomic::Ordering;

use tokio::net::TcpListener;
use tracing::info;

use arena_sync::app::AppState;
use arena_sync::config::ServerConfig;
use arena_sync::game::{ArenaParams, Simulator, WorldState};
use arena_sync::net::listener::{accept_participants, reject_late_joiners};
use arena_sync::util::telemetry::{init_tracing, shutdown_signal};
use arena_sync::util::time::{init_clock, SIMULATION_TPS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    init_tracing(&config.log_level, config.log_format);
    init_clock();

    info!("Starting arena server");
    info!(
        addr = %config.server_addr,
        tick_rate = SIMULATION_TPS,
        simulated_latency_ms = config.simulated_latency_ms,
        "Server configuration"
    );

    let listener = TcpListener::bind(config.server_addr).await?;
    info!("Server listening on {}", config.server_addr);

    let seed = config.pickup_seed.unwrap_or_else(rand::random);
    info!(seed, "Pickup RNG seeded");
    let state = AppState::new(config);

    let broadcaster = tokio::select! {
        broadcaster = accept_participants(&listener, &state) => broadcaster,
        _ = shutdown_signal() => {
            info!("Shutdown before both participants joined");
            return Ok(());
        }
    };

    tokio::spawn(reject_late_joiners(listener, state.clone()));

    let world = WorldState::new(ArenaParams::default(), seed);
    let simulator = Simulator::new(
        world,
        state.input_queue.clone(),
        broadcaster,
        state.running.clone(),
    );

    let sim = tokio::spawn(simulator.run());
    shutdown_signal().await;
    state.running.store(false, Ordering::Release);

    // the loop observes the flag at its next tick boundary
    sim.await?;

    info!("Server shutdown complete");
    Ok(())
}
