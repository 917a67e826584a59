// src/config.rs

use std::env;
use dotenvy::dotenv;
use thiserror::Error;

/// Number of days covered by the streak calendar, today included.
pub const CALENDAR_DAYS: i64 = 365;

/// Leaderboard size when the caller does not ask for one.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 5;

/// Upper bound on a requested leaderboard size.
pub const MAX_LEADERBOARD_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub rust_log: String,
    /// Streak length from which a calendar day counts as a bonus day.
    /// `None` disables bonus days.
    pub bonus_streak_days: Option<i32>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bonus_streak_days = match env::var("BONUS_STREAK_DAYS") {
            Ok(value) => Some(parse_bonus_days(&value)?),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            bind_addr,
            rust_log,
            bonus_streak_days,
        })
    }
}

fn parse_bonus_days(value: &str) -> Result<i32, ConfigError> {
    match value.trim().parse::<i32>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(ConfigError::Invalid {
            key: "BONUS_STREAK_DAYS",
            value: value.to_string(),
        }),
    }
}
