//! Server state shared by the listener, the sessions and the simulation

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::game::InputQueue;
use crate::util::time::millis_to_secs;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Written by session readers, drained by the simulation
    pub input_queue: Arc<InputQueue>,
    /// Cleared on shutdown; checked at the top of every loop
    pub running: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let input_queue = Arc::new(InputQueue::new(millis_to_secs(config.simulated_latency_ms)));

        Self {
            config: Arc::new(config),
            input_queue,
            running: Arc::new(AtomicBool::new(true)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn queue_uses_configured_latency() {
        let config = ServerConfig::from_lookup(|key| {
            (key == "SIMULATED_LATENCY_MS").then(|| "50".to_string())
        })
        .unwrap();
        let state = AppState::new(config);
        assert!((state.input_queue.simulated_latency() - 0.05).abs() < 1e-9);
        assert!(state.running.load(Ordering::Acquire));
    }
}
