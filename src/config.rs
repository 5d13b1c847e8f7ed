//! Configuration management for Tibber Future Prices
//!
//! This module handles loading, validation, and management of the service
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{PriceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "TIBBER_FUTURE_PRICES_CONFIG";

/// Environment variable overriding `tibber.access_token`
pub const ACCESS_TOKEN_ENV: &str = "TIBBER_ACCESS_TOKEN";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tibber API connection
    pub tibber: TibberConfig,

    /// Refresh cadence of the price jobs
    pub refresh: RefreshConfig,

    /// IANA time zone used to split prices into today and tomorrow
    pub timezone: String,

    /// Where configuration entries are persisted
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Read-only HTTP view of the sensors
    pub web: WebConfig,
}

/// Tibber API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TibberConfig {
    /// Tibber API access token
    pub access_token: String,

    /// GraphQL endpoint
    pub api_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Only expose homes with a running subscription
    pub only_active_homes: bool,
}

/// Refresh job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between two price refreshes of one home
    pub interval_seconds: u64,

    /// Seconds to wait before retrying a setup whose first refresh failed
    pub setup_retry_seconds: u64,
}

/// Persistent storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the configuration entries
    pub config_entries_path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file (or directory)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Serve the sensor view at all
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the environment-specified path or the default
    /// locations, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            Self::from_file(path)?
        } else {
            Self::load_from_defaults()?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_defaults() -> Result<Self> {
        let default_paths = [
            "tibber_future_prices.yaml",
            "/data/tibber_future_prices.yaml",
            "/etc/tibber-future-prices/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            self.tibber.access_token = token;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed local time zone
    pub fn time_zone(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| PriceError::validation("timezone", e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.tibber.api_url.trim().is_empty() {
            return Err(PriceError::validation(
                "tibber.api_url",
                "API URL cannot be empty",
            ));
        }

        if self.tibber.request_timeout_seconds == 0 {
            return Err(PriceError::validation(
                "tibber.request_timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if self.refresh.interval_seconds == 0 {
            return Err(PriceError::validation(
                "refresh.interval_seconds",
                "Must be greater than 0",
            ));
        }

        self.time_zone()?;
        crate::logging::parse_log_level(&self.logging.level)?;

        if self.storage.config_entries_path.trim().is_empty() {
            return Err(PriceError::validation(
                "storage.config_entries_path",
                "Path cannot be empty",
            ));
        }

        if self.web.enabled && self.web.port == 0 {
            return Err(PriceError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}
