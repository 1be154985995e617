//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{GatewayError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the campaign API (e.g. https://api.example.org/api)
    pub api_base_url: String,
    /// Path to the SQLite database holding staged session data
    pub database_url: String,
    /// Port for the gateway HTTP server
    pub api_port: u16,
    /// Timeout applied to every outbound API request
    pub http_timeout_secs: u64,
    /// Wait of the simulated payment step, in milliseconds
    pub payment_delay_ms: u64,
    /// Give up on payment confirmation after this many seconds
    pub payment_timeout_secs: u64,
    /// Staged session data idle for longer than this is swept
    pub session_ttl_secs: u64,
    /// How often (in seconds) the sweeper runs
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            api_base_url: env_var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api".to_string())
                .trim_end_matches('/')
                .to_string(),
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./storefront_sessions.db".to_string()),
            api_port: parse_or("API_PORT", 3002)?,
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", 30)?,
            payment_delay_ms: parse_or("PAYMENT_DELAY_MS", 2000)?,
            payment_timeout_secs: parse_or("PAYMENT_TIMEOUT_SECS", 60)?,
            session_ttl_secs: parse_or("SESSION_TTL_SECS", 86_400)?,
            sweep_interval_secs: parse_or("SWEEP_INTERVAL_SECS", 300)?,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn payment_delay(&self) -> Duration {
        Duration::from_millis(self.payment_delay_ms)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| GatewayError::Config(format!("Missing env var: {key}")))
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env_var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| GatewayError::Config(format!("Invalid {key}"))),
        Err(_) => Ok(default),
    }
}
