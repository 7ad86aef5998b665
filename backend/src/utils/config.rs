use anyhow::Result;
use chrono::Duration;
use std::env;
use std::str::FromStr;
use crate::constants::*;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub internal_port: u16,
    pub allowed_origins: Option<String>,
    pub sweep_interval_secs: u64,
    pub engine: EngineSettings,
}

/// The knobs the engine itself reads. Kept separate from `Config` so tests
/// can build an engine without touching the environment.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub echo_offer_ttl: Duration,
    /// `None` disables time-based interest expiry.
    pub interest_ttl: Option<Duration>,
    pub store_retry_attempts: u32,
    pub store_retry_backoff_ms: u64,
    pub archive_verify_attempts: u32,
    pub event_feed_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            echo_offer_ttl: Duration::hours(DEFAULT_ECHO_OFFER_TTL_HOURS),
            interest_ttl: None,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
            store_retry_backoff_ms: DEFAULT_STORE_RETRY_BACKOFF_MS,
            archive_verify_attempts: DEFAULT_ARCHIVE_VERIFY_ATTEMPTS,
            event_feed_capacity: DEFAULT_EVENT_FEED_CAPACITY,
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            echo_offer_ttl: Duration::hours(env_or("ECHO_OFFER_TTL_HOURS", DEFAULT_ECHO_OFFER_TTL_HOURS)),
            interest_ttl: env::var("INTEREST_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|days| *days > 0)
                .map(Duration::days),
            store_retry_attempts: env_or("STORE_RETRY_ATTEMPTS", defaults.store_retry_attempts).max(1),
            store_retry_backoff_ms: env_or("STORE_RETRY_BACKOFF_MS", defaults.store_retry_backoff_ms),
            archive_verify_attempts: env_or("ARCHIVE_VERIFY_ATTEMPTS", defaults.archive_verify_attempts).max(1),
            event_feed_capacity: env_or("EVENT_FEED_CAPACITY", defaults.event_feed_capacity).max(1),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            port: env_or("PORT", DEFAULT_SERVER_PORT),
            internal_port: env_or("INTERNAL_PORT", DEFAULT_INTERNAL_PORT),
            allowed_origins: env::var("ALLOWED_ORIGINS").ok(),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS),
            engine: EngineSettings::from_env(),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
