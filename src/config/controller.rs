//! # Controller Configuration
//!
//! Runtime tuning loaded from environment variables. These settings never
//! change what is synced, only how the process behaves while syncing.

use std::time::Duration;

/// Runtime tuning for the controller process
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Watch restart backoff starting value (milliseconds)
    pub backoff_start_ms: u64,
    /// Watch restart backoff maximum value (milliseconds)
    pub backoff_max_ms: u64,
    /// Watch restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Capacity of the bounded source event channel
    pub source_channel_capacity: usize,
    /// Timeout for a single catalog API request (seconds)
    pub catalog_request_timeout_secs: u64,
    /// How long startup waits for the HTTP server to bind (seconds)
    pub server_startup_timeout_secs: u64,
    /// Poll interval while waiting for the HTTP server (milliseconds)
    pub server_poll_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            source_channel_capacity: DEFAULT_SOURCE_CHANNEL_CAPACITY,
            catalog_request_timeout_secs: 10,
            server_startup_timeout_secs: 10,
            server_poll_interval_ms: 50,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            source_channel_capacity: env_var_or_default(
                "SOURCE_CHANNEL_CAPACITY",
                DEFAULT_SOURCE_CHANNEL_CAPACITY,
            )
            .max(1),
            catalog_request_timeout_secs: env_var_or_default("CATALOG_REQUEST_TIMEOUT_SECS", 10),
            server_startup_timeout_secs: env_var_or_default("SERVER_STARTUP_TIMEOUT_SECS", 10),
            server_poll_interval_ms: env_var_or_default("SERVER_POLL_INTERVAL_MS", 50),
        }
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get backoff start duration
    pub fn backoff_start_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_start_ms)
    }

    /// Get backoff max duration
    pub fn backoff_max_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn catalog_request_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_request_timeout_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
