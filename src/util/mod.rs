//! Shared utilities

pub mod rate_limit;
pub mod telemetry;
pub mod time;
