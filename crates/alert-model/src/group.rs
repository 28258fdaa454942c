//! Alert groups

use crate::fingerprint::{self, Fingerprint};
use crate::{Alert, Labels};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Alerts sharing a grouping key (same entity and check)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertGroup {
    /// Digest of the grouping key
    pub id: String,
    pub receiver: String,
    pub labels: Labels,
    pub alerts: Vec<Alert>,
    /// Number of alerts per upstream name
    pub upstream_counts: BTreeMap<String, usize>,
    pub latest_starts_at: DateTime<Utc>,
    /// Content fingerprint, refreshed with `update_hash`
    pub hash: Fingerprint,
}

impl AlertGroup {
    /// Create an empty group
    pub fn new(id: &str, receiver: &str, labels: Labels) -> Self {
        Self {
            id: id.to_string(),
            receiver: receiver.to_string(),
            labels,
            alerts: Vec::new(),
            upstream_counts: BTreeMap::new(),
            latest_starts_at: DateTime::<Utc>::default(),
            hash: Fingerprint::default(),
        }
    }

    /// Content fingerprint over receiver, labels and alerts
    pub fn content_fingerprint(&self) -> Fingerprint {
        fingerprint::content_fingerprint(self)
    }

    /// Recompute and store the content fingerprint
    pub fn update_hash(&mut self) {
        self.hash = self.content_fingerprint();
    }
}
