//! Logging and metrics initialization

use crate::settings::LogConfig;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber
pub fn init_logging(config: &LogConfig) -> Result<(), SetGlobalDefaultError> {
    let level = Level::from_str(&config.level).unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Expose metrics for Prometheus scraping on `addr`
pub fn install_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!("Serving metrics on {}", addr);
    Ok(())
}
