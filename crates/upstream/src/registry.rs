//! Upstream Registry

use crate::error::RegistryError;
use crate::sanitize_uri;
use crate::upstream::Upstream;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

/// Every configured upstream, keyed by name and by URI.
///
/// Built once at startup, then shared read-only (typically as
/// `Arc<UpstreamRegistry>`) with the scheduler and the merge engine.
#[derive(Debug, Default)]
pub struct UpstreamRegistry {
    by_name: BTreeMap<String, Arc<Upstream>>,
    by_uri: HashMap<String, String>,
}

impl UpstreamRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an upstream, rejecting duplicate names and duplicate URIs
    pub fn register(&mut self, upstream: Upstream) -> Result<Arc<Upstream>, RegistryError> {
        if self.by_name.contains_key(upstream.name()) {
            return Err(RegistryError::DuplicateName(upstream.name().to_string()));
        }
        if let Some(existing) = self.by_uri.get(upstream.uri()) {
            return Err(RegistryError::DuplicateSource {
                existing: existing.clone(),
                uri: sanitize_uri(upstream.uri()),
            });
        }

        info!(
            "[{}] Configured upstream at {} (readonly: {})",
            upstream.name(),
            sanitize_uri(upstream.uri()),
            upstream.is_read_only()
        );

        let upstream = Arc::new(upstream);
        self.by_uri
            .insert(upstream.uri().to_string(), upstream.name().to_string());
        self.by_name
            .insert(upstream.name().to_string(), Arc::clone(&upstream));
        Ok(upstream)
    }

    /// All upstreams in ascending name order
    pub fn list_upstreams(&self) -> Vec<Arc<Upstream>> {
        self.by_name.values().cloned().collect()
    }

    /// Upstream registered under `name`
    pub fn get(&self, name: &str) -> Option<Arc<Upstream>> {
        self.by_name.get(name).cloned()
    }

    /// Number of registered upstreams
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no upstream is registered
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
