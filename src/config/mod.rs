//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::client::prediction::ReconcileSettings;

/// Default TCP port for the arena server
pub const DEFAULT_PORT: u16 = 40000;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Artificial delay added to every input before the simulator may apply it
    pub simulated_latency_ms: u64,
    /// Seed for pickup placement; random when unset
    pub pickup_seed: Option<u64>,
    /// Per-participant outbound queue capacity (lines)
    pub outbound_queue: usize,
}

/// Client configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server address (host:port)
    pub server_addr: String,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Advisory name sent with JOIN
    pub player_name: String,
    /// How far behind real time the remote participant is rendered
    pub interpolation_delay_ms: u64,
    /// Frame loop rate (frames per second)
    pub frame_rate: u32,
    pub reconciliation: ReconcileSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // PORT wins over SERVER_ADDR, as on most hosting platforms
        let server_addr = if let Some(port) = lookup("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            lookup("SERVER_ADDR").unwrap_or_else(|| format!("0.0.0.0:{}", DEFAULT_PORT))
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr.clone()))?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: log_format(&lookup)?,
            simulated_latency_ms: parse_or(&lookup, "SIMULATED_LATENCY_MS", 200)?,
            pickup_seed: parse_opt(&lookup, "PICKUP_SEED")?,
            outbound_queue: parse_or::<usize>(&lookup, "OUTBOUND_QUEUE", 64)?.max(1),
        })
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ReconcileSettings::default();

        Ok(Self {
            server_addr: lookup("SERVER_ADDR")
                .unwrap_or_else(|| format!("127.0.0.1:{}", DEFAULT_PORT)),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: log_format(&lookup)?,
            player_name: lookup("PLAYER_NAME").unwrap_or_else(|| "player".to_string()),
            interpolation_delay_ms: parse_or(&lookup, "INTERP_DELAY_MS", 100)?,
            frame_rate: parse_or::<u32>(&lookup, "FRAME_RATE", 60)?.max(1),
            reconciliation: ReconcileSettings {
                enabled: parse_bool(&lookup, "RECONCILE", defaults.enabled)?,
                snap_distance: parse_or(&lookup, "RECONCILE_SNAP_DISTANCE", defaults.snap_distance)?,
                blend: parse_or::<f32>(&lookup, "RECONCILE_BLEND", defaults.blend)?.clamp(0.0, 1.0),
            },
        })
    }
}

fn log_format(lookup: &impl Fn(&str) -> Option<String>) -> Result<LogFormat, ConfigError> {
    match lookup("LOG_FORMAT").as_deref() {
        None | Some("pretty") | Some("text") => Ok(LogFormat::Pretty),
        Some("json") => Ok(LogFormat::Json),
        Some(other) => Err(ConfigError::Invalid {
            key: "LOG_FORMAT",
            value: other.to_string(),
        }),
    }
}

fn parse_opt<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value })
        })
        .transpose()
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
