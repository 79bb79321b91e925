//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Default listen address of the game server
const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:17666";
/// Default interval for both background loops
const DEFAULT_INTERVAL_MS: u64 = 15_000;
/// Default cap on inbound messages per connection per second
const DEFAULT_INPUT_RATE_LIMIT: u32 = 30;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// How often queued users are paired into games
    pub matchmaking_interval: Duration,
    /// How often finished games are evicted
    pub reaper_interval: Duration,
    /// Max inbound messages per second per connection
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            matchmaking_interval: Duration::from_millis(positive_var(
                "MATCHMAKING_INTERVAL_MS",
                DEFAULT_INTERVAL_MS,
            )?),
            reaper_interval: Duration::from_millis(positive_var(
                "REAPER_INTERVAL_MS",
                DEFAULT_INTERVAL_MS,
            )?),
            input_rate_limit: positive_var("INPUT_RATE_LIMIT", DEFAULT_INPUT_RATE_LIMIT as u64)?
                .try_into()
                .map_err(|_| ConfigError::InvalidNumber("INPUT_RATE_LIMIT"))?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 17666)),
            log_level: "info".to_string(),
            matchmaking_interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            reaper_interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            input_rate_limit: DEFAULT_INPUT_RATE_LIMIT,
        }
    }
}

/// Read an optional, strictly positive integer variable
fn positive_var(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_positive(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidNumber(key)),
        Ok(value) => Ok(value),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Environment variable {0} must be a positive integer")]
    InvalidNumber(&'static str),
}
