//! Configuration module - environment variable parsing

pub mod tuning;

use std::env;
use std::str::FromStr;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::net::protocol::FieldSize;

pub use tuning::GameTuning;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Ticks between snapshots published to the UI
    pub snapshot_every: u32,
    /// Playfield size shared by both peers
    pub field: FieldSize,
    /// Room code used as the broadcast topic
    pub room_code: String,
    /// Optional seed for reproducible self-play
    pub seed: Option<u64>,
    /// Self-play shot cap before the host walks away
    pub max_turns: u32,
    /// Inbound events accepted per second from the opponent
    pub event_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any name -> value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_var = |name: &'static str, default| parse_or(lookup(name), name, default);

        let tick_rate: u32 = parse_var("TICK_RATE", 60)?;
        if tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }

        let snapshot_every: u32 = parse_var("SNAPSHOT_EVERY", 1)?;
        if snapshot_every == 0 {
            return Err(ConfigError::Invalid("SNAPSHOT_EVERY"));
        }

        let width = parse_or(lookup("FIELD_WIDTH"), "FIELD_WIDTH", 1200.0)?;
        let height = parse_or(lookup("FIELD_HEIGHT"), "FIELD_HEIGHT", 600.0)?;
        let field = FieldSize::new(width, height).ok_or(ConfigError::Invalid("FIELD_WIDTH/FIELD_HEIGHT"))?;

        let seed = match lookup("SEED") {
            Some(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::Invalid("SEED"))?),
            None => None,
        };

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            tick_rate,
            snapshot_every,
            field,
            room_code: lookup("ROOM_CODE").unwrap_or_else(random_room_code),
            seed,
            max_turns: parse_var("MAX_TURNS", 40)?,
            event_rate_limit: parse_var("EVENT_RATE_LIMIT", 20)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tick_rate: 60,
            snapshot_every: 1,
            field: FieldSize::default(),
            room_code: random_room_code(),
            seed: None,
            max_turns: 40,
            event_rate_limit: 20,
        }
    }
}

/// Six uppercase alphanumerics, the shape players type into the lobby
pub fn random_room_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
