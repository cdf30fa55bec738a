//! Configuration management for the giftwatch service
//!
//! Settings load from environment variables (`GIFTWATCH_*`) or a TOML file,
//! with sensible defaults for everything so a bare `giftwatch run` works
//! out of a fresh checkout.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notify::BridgeConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store file locations
    pub store: StoreConfig,

    /// HTTP fetch limits
    pub fetch: FetchConfig,

    /// External source page URLs
    pub sources: SourcesConfig,

    /// Sweep cadence and scan depth
    pub sweep: SweepConfig,

    /// Reminder defaults
    pub reminders: RemindersConfig,

    /// Notification bridge endpoint
    pub bridge: BridgeConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Store file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Promotional code store document
    pub codes_path: PathBuf,

    /// Guild configuration registry document
    pub guilds_path: PathBuf,
}

/// HTTP fetch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Rate limit (requests per second) shared by all sources
    pub requests_per_second: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum retry attempts per request
    pub max_retries: u32,
}

/// External source page URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub axeetech_url: String,
    pub boostbot_url: String,
}

/// Sweep cadence and scan depth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Hours between sync/reconcile passes
    pub interval_hours: u64,

    /// Recent announcements scanned per channel
    pub announcement_scan_limit: usize,
}

/// Reminder defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Daily Arena reminder time, "HH:MM" UTC
    pub arena_time: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("GIFTWATCH_CODES_PATH") {
            config.store.codes_path = path.into();
        }
        if let Ok(path) = std::env::var("GIFTWATCH_GUILDS_PATH") {
            config.store.guilds_path = path.into();
        }

        if let Some(rate) = env_parse("GIFTWATCH_RATE_LIMIT") {
            config.fetch.requests_per_second = rate;
        }
        if let Some(timeout) = env_parse("GIFTWATCH_REQUEST_TIMEOUT") {
            config.fetch.request_timeout_secs = timeout;
        }
        if let Some(retries) = env_parse("GIFTWATCH_MAX_RETRIES") {
            config.fetch.max_retries = retries;
        }

        if let Ok(url) = std::env::var("GIFTWATCH_AXEETECH_URL") {
            config.sources.axeetech_url = url;
        }
        if let Ok(url) = std::env::var("GIFTWATCH_BOOSTBOT_URL") {
            config.sources.boostbot_url = url;
        }

        if let Some(hours) = env_parse("GIFTWATCH_SWEEP_INTERVAL_HOURS") {
            config.sweep.interval_hours = hours;
        }
        if let Some(limit) = env_parse("GIFTWATCH_SCAN_LIMIT") {
            config.sweep.announcement_scan_limit = limit;
        }

        if let Ok(time) = std::env::var("GIFTWATCH_ARENA_TIME") {
            config.reminders.arena_time = time;
        }

        if let Ok(url) = std::env::var("GIFTWATCH_BRIDGE_URL") {
            config.bridge.url = url;
        }
        if let Ok(token) = std::env::var("GIFTWATCH_BRIDGE_TOKEN") {
            config.bridge.auth_token = Some(token);
        }

        if let Ok(level) = std::env::var("GIFTWATCH_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("GIFTWATCH_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.fetch.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if self.fetch.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.sweep.interval_hours == 0 {
            anyhow::bail!("sweep interval_hours must be greater than 0");
        }

        if self.sweep.announcement_scan_limit == 0 {
            anyhow::bail!("announcement_scan_limit must be greater than 0");
        }

        crate::scheduler::parse_time_of_day(&self.reminders.arena_time)
            .with_context(|| format!("invalid arena_time '{}'", self.reminders.arena_time))?;

        if let Err(reason) = self.bridge.validate() {
            anyhow::bail!("invalid bridge configuration: {reason}");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.request_timeout_secs)
    }

    /// Get sweep interval as Duration
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep.interval_hours * 3600)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                codes_path: PathBuf::from("data/codes.json"),
                guilds_path: PathBuf::from("data/guilds.json"),
            },
            fetch: FetchConfig {
                requests_per_second: 2,
                request_timeout_secs: 30,
                max_retries: 3,
            },
            sources: SourcesConfig {
                axeetech_url: crate::fetch::axeetech::DEFAULT_URL.to_string(),
                boostbot_url: crate::fetch::boostbot::DEFAULT_URL.to_string(),
            },
            sweep: SweepConfig {
                interval_hours: crate::scheduler::DEFAULT_SWEEP_INTERVAL_HOURS,
                announcement_scan_limit: crate::reconcile::DEFAULT_SCAN_LIMIT,
            },
            reminders: RemindersConfig {
                arena_time: crate::scheduler::DEFAULT_ARENA_TIME.to_string(),
            },
            bridge: BridgeConfig::new("http://localhost:8130"),
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut config = Config::default();
        config.fetch.requests_per_second = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_arena_time_rejected() {
        let mut config = Config::default();
        config.reminders.arena_time = "24:99".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let mut config = Config::default();
        config.sweep.interval_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_timeout_conversion() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.sweep_interval(), Duration::from_secs(6 * 3600));
    }

    #[test]
    fn test_from_toml_roundtrip() {
        let config = Config::default();
        let toml_text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_text).unwrap();

        assert_eq!(parsed.sweep.interval_hours, config.sweep.interval_hours);
        assert_eq!(parsed.reminders.arena_time, config.reminders.arena_time);
    }
}
