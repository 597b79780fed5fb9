//! Time utilities for the simulation and the client frame loop

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Process clock origin; all timestamps in the crate are seconds since this instant
static CLOCK_EPOCH: OnceLock<Instant> = OnceLock::new();

/// Initialize the process clock (call once at startup)
pub fn init_clock() {
    CLOCK_EPOCH.get_or_init(Instant::now);
}

/// Monotonic seconds since the process clock was initialized.
///
/// Used for server time in snapshots, input admission timestamps and client
/// receipt times. Lazily initializes the clock if `init_clock` was never called.
pub fn monotonic_secs() -> f64 {
    CLOCK_EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 30; // 30 ticks per second
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Fixed tick period
pub fn tick_duration() -> Duration {
    Duration::from_micros(TICK_DURATION_MICROS)
}

/// Calculate delta time for physics (in seconds)
pub fn tick_delta() -> f32 {
    1.0 / SIMULATION_TPS as f32
}

/// Convert a millisecond setting into clock seconds
pub fn millis_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}
