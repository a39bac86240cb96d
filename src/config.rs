//! Configuration management for Elpris
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. `ELPRIS_CONFIG` may point at an explicit file.

use crate::error::{ElprisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "ELPRIS_CONFIG";

/// Upper bound for `api.hours_ahead`
pub const MAX_HOURS_AHEAD: u32 = 24 * 31;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Price API request parameters
    pub api: ApiConfig,

    /// Refresh triggering
    pub refresh: RefreshConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,
}

/// Price API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the price service, without the `/api/prices` path
    pub base_url: String,

    /// Product identifier sent as `productId`
    pub product_id: String,

    /// Supplier identifier sent as `supplierId`
    pub supplier_id: String,

    /// Lookahead window in hours past the current local hour
    pub hours_ahead: u32,

    /// Resolution selector sent as `aggregation`
    pub aggregation: String,

    /// Aggregation strategy sent as `aggregationMethod`
    pub aggregation_method: String,

    /// Request forecasted points as well
    pub include_forecast: bool,

    /// Request the reduced payload
    pub lean: bool,

    /// Civil timezone the hour grid is built in
    pub timezone: String,

    /// Per-request timeout in seconds; 0 leaves the request unbounded
    pub request_timeout_secs: u64,
}

/// Refresh triggering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Fire one manual trigger right after startup
    pub refresh_on_startup: bool,

    /// Period of the scheduler signal source in seconds; 0 disables it
    pub interval_secs: u64,
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

    /// Log directory, or a file path whose parent directory is used
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
    /// Serve the HTTP API
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
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `ELPRIS_CONFIG` or the default locations
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
            && !path.trim().is_empty()
        {
            return Self::from_file(path.trim());
        }

        let default_paths = ["elpris.yaml", "/etc/elpris/config.yaml"];
        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ElprisError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(ElprisError::validation(
                "api.base_url",
                "Base URL must be http(s)",
            ));
        }
        if self.api.product_id.trim().is_empty() {
            return Err(ElprisError::validation(
                "api.product_id",
                "Product ID cannot be empty",
            ));
        }
        if self.api.supplier_id.trim().is_empty() {
            return Err(ElprisError::validation(
                "api.supplier_id",
                "Supplier ID cannot be empty",
            ));
        }

        if self.api.hours_ahead > MAX_HOURS_AHEAD {
            return Err(ElprisError::validation(
                "api.hours_ahead".to_string(),
                format!(
                    "Lookahead of {}h exceeds the maximum of {}h",
                    self.api.hours_ahead, MAX_HOURS_AHEAD
                ),
            ));
        }

        // An unknown zone is a deployment defect, not a runtime condition
        if self.api.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ElprisError::validation(
                "api.timezone".to_string(),
                format!("Unknown timezone '{}'", self.api.timezone),
            ));
        }

        crate::logging::parse_log_level(&self.logging.level)?;
        for level in [&self.logging.console_level, &self.logging.file_level]
            .into_iter()
            .flatten()
        {
            crate::logging::parse_log_level(level)?;
        }

        if self.web.enabled && self.web.port == 0 {
            return Err(ElprisError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.hours_ahead, 48);
        assert_eq!(config.api.timezone, "Europe/Copenhagen");
        assert_eq!(config.web.port, 8089);
        assert!(config.refresh.refresh_on_startup);
        assert_eq!(config.refresh.interval_secs, 0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.api.base_url = String::new();
        assert!(config.validate().is_err());

        config = Config::default();
        config.api.product_id = "  ".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.web.port = 0;
        assert!(config.validate().is_err());

        config.web.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_timezone_is_a_validation_error() {
        let mut config = Config::default();
        config.api.timezone = "Europe/Atlantis".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ElprisError::Validation { ref field, .. } if field == "api.timezone"));
    }

    #[test]
    fn oversized_lookahead_is_a_validation_error() {
        let mut config = Config::default();
        config.api.hours_ahead = MAX_HOURS_AHEAD;
        assert!(config.validate().is_ok());

        config.api.hours_ahead = u32::MAX;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ElprisError::Validation { ref field, .. } if field == "api.hours_ahead"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.api.product_id, deserialized.api.product_id);
        assert_eq!(config.web.port, deserialized.web.port);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "api:\n  hours_ahead: 12\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.hours_ahead, 12);
        assert_eq!(config.api.aggregation, "1h");
        assert!(config.validate().is_ok());
    }
}
