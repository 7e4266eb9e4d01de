//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::fetch::{FetcherConfig, RetryPolicy};
use crate::pipeline::PollConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Where the site lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL for HTML pages (games played, leaderboards)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL for the XML API (collection export)
    #[serde(default = "default_export_base_url")]
    pub export_base_url: String,
}

fn default_base_url() -> String {
    "https://boardgamegeek.com".to_string()
}

fn default_export_base_url() -> String {
    "https://www.boardgamegeek.com".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            export_base_url: default_export_base_url(),
        }
    }
}

/// HTTP client behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Gap between consecutive requests
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Page cache lifetime; 0 disables the cache
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Max retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_initial_delay_ms: u64,
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("play-ranks/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_delay() -> u64 {
    500
}

fn default_cache_ttl() -> u64 {
    900
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            request_delay_ms: default_request_delay(),
            cache_ttl_seconds: default_cache_ttl(),
            max_retries: default_max_retries(),
            retry_initial_delay_ms: default_retry_delay(),
        }
    }
}

impl FetchSettings {
    /// Build a fetcher configuration caching under `cache_dir`.
    pub fn fetcher_config(&self, cache_dir: PathBuf) -> FetcherConfig {
        FetcherConfig {
            cache_dir,
            cache_ttl: Duration::from_secs(self.cache_ttl_seconds),
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone(),
            request_delay: Duration::from_millis(self.request_delay_ms),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_delay_ms: self.retry_initial_delay_ms,
                ..RetryPolicy::default()
            },
            ..FetcherConfig::default()
        }
    }
}

/// Collection export polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Wait between requests while the export is generating
    #[serde(default = "default_poll_interval")]
    pub interval_seconds: u64,

    /// Give up after this long; unset waits indefinitely
    #[serde(default)]
    pub max_wait_seconds: Option<u64>,
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_poll_interval(),
            max_wait_seconds: None,
        }
    }
}

impl PollSettings {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.interval_seconds),
            max_wait: self.max_wait_seconds.map(Duration::from_secs),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache and working data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where reports are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub poll: PollSettings,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            log_level: default_log_level(),
            source: SourceConfig::default(),
            fetch: FetchSettings::default(),
            poll: PollSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Fetch timeout must be greater than 0".to_string(),
            ));
        }

        if self.source.base_url.trim().is_empty() || self.source.export_base_url.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "Source base URLs must not be empty".to_string(),
            ));
        }

        if self.poll.max_wait_seconds == Some(0) {
            return Err(ConfigError::ValidationError(
                "Poll max_wait_seconds must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.source.base_url, "https://boardgamegeek.com");
        assert_eq!(config.poll.interval_seconds, 5);
        assert_eq!(config.poll.max_wait_seconds, None);
    }

    #[test]
    fn test_config_validation_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.fetch.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_base_url() {
        let mut config = AppConfig::default();
        config.source.base_url = " ".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_max_wait() {
        let mut config = AppConfig::default();
        config.poll.max_wait_seconds = Some(0);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            output_dir = "./reports"

            [poll]
            max_wait_seconds = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("./reports"));
        assert_eq!(config.poll.interval_seconds, 5);
        assert_eq!(
            config.poll.poll_config().max_wait,
            Some(Duration::from_secs(120))
        );
        assert_eq!(config.fetch.max_retries, 3);
    }

    #[test]
    fn test_fetcher_config_from_settings() {
        let settings = FetchSettings {
            cache_ttl_seconds: 0,
            max_retries: 5,
            ..FetchSettings::default()
        };
        let fetcher = settings.fetcher_config(PathBuf::from("/tmp/cache"));

        assert_eq!(fetcher.cache_dir, PathBuf::from("/tmp/cache"));
        assert!(fetcher.cache_ttl.is_zero());
        assert_eq!(fetcher.retry.max_retries, 5);
        assert_eq!(fetcher.request_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("play-ranks.toml");
        std::fs::write(&path, "[fetch]\ntimeout_seconds = 0\n").unwrap();

        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
    }
}
