//! Configuration management for sonar front ends
//!
//! The scanning engine never reads this; front ends load it and pass plain
//! `ScanOptions` values into each scan.

use serde::{Deserialize, Serialize};
use sonar_core::{Error, Result, ScanOptions};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default options for port scans
    #[serde(default)]
    pub scan: ScanOptions,

    /// Host discovery sweep settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Merge with environment variables (SONAR_ prefix).
    ///
    /// Unparseable values are ignored and the current value kept.
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(n) = var("SONAR_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.scan.timeout_ms = n;
        }
        if let Some(n) = var("SONAR_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.scan.concurrency = n;
        }
        if let Some(b) = var("SONAR_SERVICE_DETECTION").and_then(|v| parse_bool(&v)) {
            self.scan.service_detection = b;
        }
        if let Some(b) = var("SONAR_BANNER_GRAB").and_then(|v| parse_bool(&v)) {
            self.scan.banner_grab = b;
        }

        if let Some(val) = var("SONAR_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = var("SONAR_LOG_FORMAT") {
            self.logging.format = val;
        }

        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Host discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Host suffixes probed per sweep; capped at 50 by the engine
    #[serde(default = "default_host_limit")]
    pub host_limit: u32,

    /// Pings in flight at once
    #[serde(default = "default_discovery_concurrency")]
    pub concurrency: usize,

    /// Budget for one ping process in milliseconds
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_ms: u64,
}

fn default_host_limit() -> u32 {
    50
}

fn default_discovery_concurrency() -> usize {
    16
}

fn default_ping_timeout() -> u64 {
    2000
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            host_limit: default_host_limit(),
            concurrency: default_discovery_concurrency(),
            ping_timeout_ms: default_ping_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_log_format() -> String {
    String::from("pretty")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Builder for constructing Config
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn scan_options(mut self, options: ScanOptions) -> Self {
        self.config.scan = options;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.scan.timeout_ms = timeout_ms;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.scan.concurrency = concurrency;
        self
    }

    pub fn banner_grab(mut self, enabled: bool) -> Self {
        self.config.scan.banner_grab = enabled;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [scan]
            timeoutMs = 1500
            bannerGrab = true

            [discovery]
            concurrency = 4

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.scan.timeout_ms, 1500);
        assert!(config.scan.banner_grab);
        assert_eq!(config.scan.concurrency, 100);
        assert_eq!(config.discovery.concurrency, 4);
        assert_eq!(config.discovery.host_limit, 50);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.scan, ScanOptions::default());
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = Config::from_toml("[scan\ntimeoutMs =").unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = Config::from_file("/nonexistent/sonar.toml").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_merge_vars() {
        let vars: HashMap<&str, &str> = [
            ("SONAR_TIMEOUT_MS", "250"),
            ("SONAR_CONCURRENCY", "not-a-number"),
            ("SONAR_BANNER_GRAB", "yes"),
            ("SONAR_LOG_LEVEL", "trace"),
        ]
        .into_iter()
        .collect();

        let config = Config::default().merge_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.scan.timeout_ms, 250);
        assert_eq!(config.scan.concurrency, 100);
        assert!(config.scan.banner_grab);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .timeout_ms(900)
            .concurrency(10)
            .banner_grab(true)
            .log_level("warn")
            .build();

        assert_eq!(config.scan.timeout_ms, 900);
        assert_eq!(config.scan.concurrency, 10);
        assert!(config.scan.banner_grab);
        assert_eq!(config.logging.level, "warn");
    }
}
