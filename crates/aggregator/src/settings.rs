//! Service configuration
//!
//! Layered with the `config` crate: an optional file (TOML, YAML or JSON,
//! picked by extension) overridden by `AGGREGATOR__*` environment variables,
//! e.g. `AGGREGATOR__REFRESH_INTERVAL_SECS=30`.

use filter_policy::FilterConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use upstream::{RegistryError, UpstreamConfig, ALL_NAMESPACES, DEFAULT_RECEIVER};

/// Configuration errors, fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No event client for upstream '{name}' at '{uri}'")]
    UnsupportedSource { name: String, uri: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// One configured upstream
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub readonly: bool,
    /// Request timeout in seconds, 0 for the default
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub event_limit: usize,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub receiver: Option<String>,
}

impl UpstreamSettings {
    pub fn to_upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig::new(&self.name, &self.uri)
            .read_only(self.readonly)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_namespaces(self.namespaces.clone())
            .with_event_limit(self.event_limit)
            .with_user_pass(&self.username, &self.password)
            .with_receiver(self.receiver.as_deref().unwrap_or(DEFAULT_RECEIVER))
    }
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Seconds between two pulls of the same upstream
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub log: LogConfig,
    /// Address for the Prometheus exporter, disabled when unset
    #[serde(default)]
    pub metrics_listen: Option<SocketAddr>,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub upstreams: Vec<UpstreamSettings>,
}

fn default_refresh_interval() -> u64 {
    60
}

impl AppConfig {
    /// Load from an optional file plus the environment, then validate
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("AGGREGATOR").separator("__"))
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, then validate
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid("refresh_interval_secs must be positive".to_string()));
        }
        if self.upstreams.is_empty() {
            return Err(ConfigError::Invalid("no upstreams configured".to_string()));
        }
        if let Some(u) = self.upstreams.iter().find(|u| u.name.is_empty() || u.uri.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "upstream '{}' needs both a name and a uri",
                u.name
            )));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
refresh_interval_secs = 30

[log]
level = "debug"

[filters.receivers]
strip = ["blackhole"]

[filters.labels]
keep = ["env", "check.name"]

[[upstreams]]
name = "eu"
uri = "file:///var/lib/aggregator/eu.json"
namespaces = ["prod"]
timeout_secs = 5

[[upstreams]]
name = "us"
uri = "file:///var/lib/aggregator/us.json"
readonly = true
receiver = "ops"
"#;

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.log.level, "debug");
        assert!(!config.log.json);
        assert!(config.metrics_listen.is_none());
        assert_eq!(config.filters.receivers.strip, vec!["blackhole".to_string()]);
        assert_eq!(config.filters.labels.keep.len(), 2);
        assert!(config.filters.annotations.keep.is_empty());
        assert_eq!(config.upstreams.len(), 2);
    }

    #[test]
    fn test_upstream_conversion() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        let eu = config.upstreams[0].to_upstream_config();
        assert_eq!(eu.timeout, Duration::from_secs(5));
        assert_eq!(eu.namespaces, vec!["prod".to_string()]);
        assert_eq!(eu.receiver, DEFAULT_RECEIVER);

        let us = config.upstreams[1].to_upstream_config();
        assert!(us.read_only);
        assert_eq!(us.receiver, "ops");
        assert_eq!(us.namespaces, vec![ALL_NAMESPACES.to_string()]);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml(
            r#"
[[upstreams]]
name = "a"
uri = "file:///a.json"
"#,
        )
        .unwrap();
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_rejects_empty_upstreams() {
        let err = AppConfig::from_toml("refresh_interval_secs = 10").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = AppConfig::from_toml(
            r#"
refresh_interval_secs = 0

[[upstreams]]
name = "a"
uri = "file:///a.json"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
