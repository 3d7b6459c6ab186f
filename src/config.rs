//! Configuration management for Apiary

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Broker address (host:port)
    pub broker_addr: String,

    /// Timeout for a single broker round trip in seconds
    pub response_timeout: u64,

    /// Default timeout for a worker RPC in seconds
    pub call_timeout: u64,

    /// Maximum attempts for a broker operation
    pub retry_max_attempts: u32,

    /// Base retry backoff in milliseconds
    pub retry_base_backoff_ms: u64,

    /// Directory for persisted browser profile identifiers
    pub profile_dir: Option<String>,

    /// Directory for assertion-failure artifacts
    pub failure_dir: String,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker_addr: "127.0.0.1:6379".to_string(),
            response_timeout: 5,
            call_timeout: 30,
            retry_max_attempts: 3,
            retry_base_backoff_ms: 200,
            profile_dir: None,
            failure_dir: "failures".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(addr) = env::var("APIARY_BROKER_ADDR") {
            config.broker_addr = addr;
        }

        if let Ok(timeout) = env::var("APIARY_RESPONSE_TIMEOUT") {
            config.response_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid APIARY_RESPONSE_TIMEOUT"))?;
        }

        if let Ok(timeout) = env::var("APIARY_CALL_TIMEOUT") {
            config.call_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid APIARY_CALL_TIMEOUT"))?;
        }

        if let Ok(attempts) = env::var("APIARY_RETRY_MAX_ATTEMPTS") {
            config.retry_max_attempts = attempts
                .parse()
                .map_err(|_| Error::configuration("Invalid APIARY_RETRY_MAX_ATTEMPTS"))?;
        }

        if let Ok(backoff) = env::var("APIARY_RETRY_BASE_BACKOFF_MS") {
            config.retry_base_backoff_ms = backoff
                .parse()
                .map_err(|_| Error::configuration("Invalid APIARY_RETRY_BASE_BACKOFF_MS"))?;
        }

        if let Ok(dir) = env::var("APIARY_PROFILE_DIR") {
            config.profile_dir = Some(dir);
        }

        if let Ok(dir) = env::var("APIARY_FAILURE_DIR") {
            config.failure_dir = dir;
        }

        if let Ok(log_level) = env::var("APIARY_LOG_LEVEL") {
            config.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations a client cannot be constructed from
    pub fn validate(&self) -> Result<()> {
        if self.broker_addr.is_empty() {
            return Err(Error::configuration("Broker address must not be empty"));
        }
        if self.retry_max_attempts == 0 {
            return Err(Error::configuration("retry_max_attempts must be at least 1"));
        }
        Ok(())
    }

    /// Broker round-trip deadline as a Duration
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout)
    }

    /// Default worker RPC deadline as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout)
    }

    /// Base retry backoff as a Duration
    pub fn retry_base_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_base_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.broker_addr, "127.0.0.1:6379");
        assert_eq!(config.retry_max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_broker_addr_rejected() {
        let config = Config {
            broker_addr: String::new(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = Config {
            retry_max_attempts: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_from_toml() {
        let config: Config = toml::from_str(
            r#"
            broker_addr = "10.0.0.5:6380"
            response_timeout = 2
            call_timeout = 10
            retry_max_attempts = 5
            retry_base_backoff_ms = 50
            failure_dir = "artifacts"
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.broker_addr, "10.0.0.5:6380");
        assert_eq!(config.retry_max_attempts, 5);
        assert_eq!(config.failure_dir, "artifacts");
        assert_eq!(config.profile_dir, None);
    }
}
