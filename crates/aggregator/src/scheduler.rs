//! Refresh Scheduler
//!
//! Each upstream is pulled from its own task on a fixed interval, so a slow
//! or failing upstream never delays the others. A separate task merges the
//! published snapshots on the same interval.

use dedup::DedupEngine;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use upstream::Upstream;

/// Drives periodic pulls and merges
pub struct Scheduler {
    engine: DedupEngine,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler pulling every upstream once per `interval`
    pub fn new(engine: DedupEngine, interval: Duration) -> Self {
        info!(
            "Scheduler created for {} upstream(s), interval {:?}",
            engine.registry().len(),
            interval
        );
        Self { engine, interval }
    }

    /// Engine the merge loop runs
    pub fn engine(&self) -> &DedupEngine {
        &self.engine
    }

    /// Pull every upstream once, concurrently; returns the number of failures
    pub async fn refresh_all(&self) -> usize {
        let mut pulls = JoinSet::new();
        for upstream in self.engine.registry().list_upstreams() {
            pulls.spawn(async move { upstream.pull().await });
        }

        let mut failed = 0;
        while let Some(result) = pulls.join_next().await {
            match result {
                Ok(Ok(())) => {}
                // already logged by the upstream
                Ok(Err(_)) => failed += 1,
                Err(e) => {
                    warn!("Refresh task aborted: {}", e);
                    failed += 1;
                }
            }
        }
        failed
    }

    /// Spawn one pull loop per upstream plus the merge loop
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        let mut handles: Vec<JoinHandle<()>> = self
            .engine
            .registry()
            .list_upstreams()
            .into_iter()
            .map(|upstream| tokio::spawn(pull_loop(upstream, self.interval)))
            .collect();
        handles.push(tokio::spawn(merge_loop(self.engine.clone(), self.interval)));
        handles
    }

    /// Run every loop until `shutdown` completes, then stop them
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Starting scheduler");
        let handles = self.spawn();
        shutdown.await;
        info!("Stopping scheduler");
        for handle in handles {
            handle.abort();
        }
    }
}

async fn pull_loop(upstream: Arc<Upstream>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        debug!("[{}] Pulling", upstream.name());
        if upstream.pull().await.is_err() {
            debug!("[{}] Keeping last snapshot", upstream.name());
        }
    }
}

async fn merge_loop(engine: DedupEngine, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let groups = engine.dedup_alerts();
        let alerts: usize = groups.iter().map(|g| g.alerts.len()).sum();
        info!(
            "Merged view: {} alert group(s), {} alert(s), {} known label(s)",
            groups.len(),
            alerts,
            engine.dedup_known_labels().len()
        );
    }
}
