//! Configuration management for jokebox
//!
//! This module handles loading and validating configuration from a TOML file
//! or built-in defaults. There are no environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::utils::retry::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Joke source configuration
    pub source: SourceConfig,

    /// Persistent storage configuration
    pub storage: StorageConfig,

    /// Joke cache configuration
    pub cache: CacheConfig,

    /// Fetch retry configuration
    pub retry: RetrySettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Export URL of the joke spreadsheet
    pub url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

/// Persistent storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the file store
    pub dir: PathBuf,

    /// Key of the seen-id slot
    pub seen_key: String,

    /// Key of the joke cache slot
    pub cache_key: String,
}

/// Joke cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of the cached joke set in milliseconds
    pub ttl_ms: u64,
}

/// Fetch retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total fetch attempts before giving up
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    pub delay_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::from(
                "https://docs.google.com/spreadsheets/d/e/jokes/pub?output=csv",
            ),
            timeout_secs: 15,
            user_agent: format!("jokebox/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            seen_key: String::from("jokes_seen"),
            cache_key: String::from("jokes_cache"),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 60 * 60 * 1000,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))
    }

    /// Load and validate the configuration at `path`, or the defaults when
    /// the file does not exist
    ///
    /// Read, parse and validation failures all surface as [`Error::Config`].
    pub fn load(path: &Path) -> std::result::Result<Self, Error> {
        let config = if path.exists() {
            Self::from_file(path).map_err(|e| Error::config(format!("{e:#}")))?
        } else {
            Self::default()
        };

        config
            .validate()
            .map_err(|e| Error::config(format!("{e:#}")))?;
        Ok(config)
    }

    /// Parse configuration from TOML text; missing keys take defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.source.url)
            .with_context(|| format!("source.url is not a valid URL: {}", self.source.url))?;

        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be greater than 0");
        }

        if self.storage.seen_key.is_empty() || self.storage.cache_key.is_empty() {
            anyhow::bail!("storage keys must not be empty");
        }

        if self.storage.seen_key == self.storage.cache_key {
            anyhow::bail!("storage.seen_key and storage.cache_key must differ");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Get cache TTL as Duration
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }

    /// Get retry policy for the fetch loop
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_delay(self.retry.max_attempts, self.retry.delay_ms)
    }
}
