//! Alert Aggregator Service
//!
//! Loads configuration, registers every configured upstream and keeps their
//! snapshots fresh while periodically merging them into one view.

mod logging;
mod scheduler;
mod settings;

pub use logging::{init_logging, install_metrics};
pub use scheduler::Scheduler;
pub use settings::{AppConfig, ConfigError, LogConfig, UpstreamSettings};

use std::sync::Arc;
use upstream::client::FileEventClient;
use upstream::{EventClient, Upstream, UpstreamRegistry};

/// Register every configured upstream.
///
/// Only `file://` sources have a built-in event client; any other scheme is
/// rejected so a misconfigured upstream never silently reports nothing.
pub fn build_registry(config: &AppConfig) -> Result<UpstreamRegistry, ConfigError> {
    let mut registry = UpstreamRegistry::new();
    for settings in &config.upstreams {
        let client: Arc<dyn EventClient> = if settings.uri.starts_with("file://") {
            Arc::new(FileEventClient::from_uri(&settings.uri))
        } else {
            return Err(ConfigError::UnsupportedSource {
                name: settings.name.clone(),
                uri: upstream::sanitize_uri(&settings.uri),
            });
        };
        registry.register(Upstream::new(settings.to_upstream_config(), client))?;
    }
    Ok(registry)
}
