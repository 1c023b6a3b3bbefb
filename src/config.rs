//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if the Redis URL is missing.
//! The URL may embed credentials, so it is wrapped in
//! secrecy::SecretString to keep it out of logs.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::{Error, Result};

/// Reaper tick period and claim staleness threshold when unconfigured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(60_000);

/// Sweep intervals below this are clamped up.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub struct Config {
    pub redis_url: SecretString,
    pub sweep_interval: Duration,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    ///
    /// Recognized: `REDISRQS_REDIS_URL` (falls back to `REDIS_URL`),
    /// `REDISRQS_SWEEP_INTERVAL_MS`, `LOG_LEVEL`.
    pub fn from_env() -> Result<Self> {
        let redis_url = std::env::var("REDISRQS_REDIS_URL")
            .or_else(|_| std::env::var("REDIS_URL"))
            .map_err(|_| {
                Error::Config("REDISRQS_REDIS_URL (or REDIS_URL) is not set".to_string())
            })?;

        let sweep_interval = match std::env::var("REDISRQS_SWEEP_INTERVAL_MS") {
            Ok(raw) => {
                let ms: u64 = raw.parse().map_err(|_| {
                    Error::Config(format!(
                        "REDISRQS_SWEEP_INTERVAL_MS must be an integer, got {raw:?}"
                    ))
                })?;
                clamp_sweep_interval(Duration::from_millis(ms))
            }
            Err(_) => DEFAULT_SWEEP_INTERVAL,
        };

        Ok(Self {
            redis_url: SecretString::from(redis_url),
            sweep_interval,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Enforce the minimum tick period. A zero interval would spin the reaper
/// and sweep every claim the instant it is made.
pub fn clamp_sweep_interval(interval: Duration) -> Duration {
    interval.max(MIN_SWEEP_INTERVAL)
}
