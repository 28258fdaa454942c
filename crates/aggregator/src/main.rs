//! Alert Aggregator - Main Entry Point

use aggregator::{build_registry, init_logging, install_metrics, AppConfig, Scheduler};
use dedup::DedupEngine;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1);
    let config = AppConfig::load(config_path.as_deref())?;
    init_logging(&config.log)?;

    info!("=== Alert Aggregator v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = config.metrics_listen {
        install_metrics(addr)?;
    }

    let registry = build_registry(&config)?;
    let engine = DedupEngine::new(Arc::new(registry), config.filters.clone());
    let scheduler = Scheduler::new(engine, config.refresh_interval());

    let failed = scheduler.refresh_all().await;
    info!("Initial refresh done, {} upstream(s) failed", failed);

    scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for shutdown signal: {}", e);
            }
        })
        .await;

    info!("Shutting down");
    Ok(())
}
