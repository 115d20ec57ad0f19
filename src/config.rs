//! Configuration loader for the `riverrevive-monitor` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). The backend base URL is the only value the
//! polling core strictly needs; the rest tune timers and the snapshot server.
//!
use std::{env, net::SocketAddr, time::Duration};

use anyhow::{anyhow, Result};

/// Default base URL of the sensor/prediction backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Sensor/prediction backend base URL, without a trailing slash.
    pub backend_url: String,

    /// Period of the health cycle.
    pub health_interval: Duration,

    /// Period of the data cycle.
    pub data_interval: Duration,

    /// Per-request timeout for backend calls.
    pub http_timeout: Duration,

    /// Address the snapshot server listens on.
    pub bind_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            health_interval: Duration::from_secs(30),
            data_interval: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `BACKEND_URL` – backend base URL (default: `http://localhost:8000`)
/// - `HEALTH_INTERVAL_SECS` – health cycle period (default: 30)
/// - `DATA_INTERVAL_SECS` – data cycle period (default: 5)
/// - `HTTP_TIMEOUT_SECS` – backend request timeout (default: 10)
/// - `MONITOR_BIND_ADDR` – snapshot server address (default: `0.0.0.0:8080`)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let backend_url = normalize_base_url(&env_or!("BACKEND_URL", DEFAULT_BACKEND_URL))?;
    let health_secs = parse_env_u64!("HEALTH_INTERVAL_SECS", 30);
    let data_secs = parse_env_u64!("DATA_INTERVAL_SECS", 5);
    let timeout_secs = parse_env_u64!("HTTP_TIMEOUT_SECS", 10);

    let bind_raw = env_or!("MONITOR_BIND_ADDR", "0.0.0.0:8080");
    let bind_addr = bind_raw
        .parse::<SocketAddr>()
        .map_err(|e| anyhow!("Invalid MONITOR_BIND_ADDR '{}': {}", bind_raw, e))?;

    Ok(Config {
        backend_url,
        health_interval: positive_secs("HEALTH_INTERVAL_SECS", health_secs)?,
        data_interval: positive_secs("DATA_INTERVAL_SECS", data_secs)?,
        http_timeout: positive_secs("HTTP_TIMEOUT_SECS", timeout_secs)?,
        bind_addr,
    })
}

/// Trim whitespace and trailing slashes so endpoint paths can be appended.
fn normalize_base_url(raw: &str) -> Result<String> {
    // ---
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(anyhow!(
            "Invalid BACKEND_URL '{}': expected an http:// or https:// URL",
            raw
        ));
    }
    Ok(trimmed.to_string())
}

fn positive_secs(var_name: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(anyhow!("Invalid {}: must be greater than zero", var_name));
    }
    Ok(Duration::from_secs(secs))
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  BACKEND_URL          : {}", self.backend_url);
        tracing::info!("  HEALTH_INTERVAL_SECS : {}", self.health_interval.as_secs());
        tracing::info!("  DATA_INTERVAL_SECS   : {}", self.data_interval.as_secs());
        tracing::info!("  HTTP_TIMEOUT_SECS    : {}", self.http_timeout.as_secs());
        tracing::info!("  MONITOR_BIND_ADDR    : {}", self.bind_addr);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        // ---
        let url = normalize_base_url("http://backend:8000/ ").unwrap();
        assert_eq!(url, "http://backend:8000");

        let url = normalize_base_url("https://example.org//").unwrap();
        assert_eq!(url, "https://example.org");
    }

    #[test]
    fn test_base_url_requires_http_scheme() {
        // ---
        assert!(normalize_base_url("localhost:8000").is_err());
        assert!(normalize_base_url("ftp://host").is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        // ---
        let err = positive_secs("DATA_INTERVAL_SECS", 0).unwrap_err();
        assert!(err.to_string().contains("DATA_INTERVAL_SECS"));
        assert_eq!(
            positive_secs("DATA_INTERVAL_SECS", 5).unwrap(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_defaults_match_dashboard_timers() {
        // ---
        let cfg = Config::default();
        assert_eq!(cfg.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(cfg.health_interval, Duration::from_secs(30));
        assert_eq!(cfg.data_interval, Duration::from_secs(5));
    }
}
