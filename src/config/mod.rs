//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human readable ones
    pub log_json: bool,
    /// Allowed client origins for CORS ("*" allows any)
    pub client_origin: String,

    /// Round lifecycle timings
    pub round: RoundConfig,

    /// Max inbound messages per second per connection
    pub input_rate_limit: u32,
    /// Outbound messages buffered per connection before it counts as dead
    pub outbound_queue: usize,
    /// Seed for spawn selection (random when unset)
    pub spawn_seed: Option<u64>,
}

/// Round lifecycle settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundConfig {
    /// Connected players needed before a countdown begins
    pub min_players: usize,
    /// Countdown start value in seconds
    pub countdown_secs: u32,
    /// Round length in seconds
    pub round_duration_secs: u32,
    /// Delay between a round ending and the next start check
    pub intermission_secs: u32,
}

impl RoundConfig {
    pub fn intermission(&self) -> Duration {
        Duration::from_secs(u64::from(self.intermission_secs))
    }
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            countdown_secs: 5,
            round_duration_secs: 120,
            intermission_secs: 5,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        let defaults = RoundConfig::default();
        let round = RoundConfig {
            min_players: parse_var("MIN_PLAYERS", defaults.min_players)?,
            countdown_secs: parse_var("COUNTDOWN_SECS", defaults.countdown_secs)?,
            round_duration_secs: parse_var("ROUND_DURATION_SECS", defaults.round_duration_secs)?,
            intermission_secs: parse_var("INTERMISSION_SECS", defaults.intermission_secs)?,
        };

        if round.min_players == 0 {
            return Err(ConfigError::Invalid("MIN_PLAYERS"));
        }
        if round.countdown_secs == 0 {
            return Err(ConfigError::Invalid("COUNTDOWN_SECS"));
        }
        if round.round_duration_secs == 0 {
            return Err(ConfigError::Invalid("ROUND_DURATION_SECS"));
        }

        let input_rate_limit = parse_var("INPUT_RATE_LIMIT", 120)?;
        let outbound_queue: usize = parse_var("OUTBOUND_QUEUE", 256)?;
        if outbound_queue == 0 {
            return Err(ConfigError::Invalid("OUTBOUND_QUEUE"));
        }

        let spawn_seed = match env::var("SPAWN_SEED") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid("SPAWN_SEED"))?),
            Err(_) => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: matches!(env::var("LOG_FORMAT").as_deref(), Ok("json")),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            round,
            input_rate_limit,
            outbound_queue,
            spawn_seed,
        })
    }

    /// Configuration for local runs and tests, bound to an ephemeral port
    pub fn local(round: RoundConfig) -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_level: "info".to_string(),
            log_json: false,
            client_origin: "*".to_string(),
            round,
            input_rate_limit: 120,
            outbound_queue: 256,
            spawn_seed: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
