//! Stable fingerprints for alerts and alert groups
//!
//! All digests are SHA-256, hex encoded. Every variable-length field is
//! length-prefixed so that adjacent fields can never be confused, and every
//! collection is hashed in sorted order.

use crate::{Alert, AlertGroup, Labels};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex encoded SHA-256 digest
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn update_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn update_map(hasher: &mut Sha256, map: &Labels) {
    hasher.update((map.len() as u64).to_be_bytes());
    for (key, value) in map {
        update_field(hasher, key);
        update_field(hasher, value);
    }
}

fn update_sorted(hasher: &mut Sha256, values: &[String]) {
    let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    hasher.update((sorted.len() as u64).to_be_bytes());
    for value in sorted {
        update_field(hasher, value);
    }
}

fn finish(hasher: Sha256) -> Fingerprint {
    Fingerprint(format!("{:x}", hasher.finalize()))
}

/// Fingerprint of a label set; identical labels give identical fingerprints
pub fn label_fingerprint(labels: &Labels) -> Fingerprint {
    let mut hasher = Sha256::new();
    update_map(&mut hasher, labels);
    finish(hasher)
}

/// Derive an identifier from an ordered list of identity parts
pub fn group_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        update_field(&mut hasher, part);
    }
    finish(hasher).0
}

fn alert_digest(alert: &Alert) -> Vec<u8> {
    let mut hasher = Sha256::new();
    update_map(&mut hasher, alert.labels());
    update_map(&mut hasher, &alert.annotations);
    update_field(&mut hasher, alert.state.as_str());
    hasher.update(alert.starts_at.timestamp().to_be_bytes());
    hasher.update(alert.starts_at.timestamp_subsec_nanos().to_be_bytes());
    update_sorted(&mut hasher, &alert.silenced_by);
    update_sorted(&mut hasher, &alert.inhibited_by);

    let mut sources: Vec<(&str, &str, &str)> = alert
        .sources
        .iter()
        .map(|s| (s.name.as_str(), s.cluster.as_str(), s.state.as_str()))
        .collect();
    sources.sort_unstable();
    hasher.update((sources.len() as u64).to_be_bytes());
    for (name, cluster, state) in sources {
        update_field(&mut hasher, name);
        update_field(&mut hasher, cluster);
        update_field(&mut hasher, state);
    }

    hasher.finalize().to_vec()
}

/// Fingerprint of a group's content, independent of alert order
pub fn content_fingerprint(group: &AlertGroup) -> Fingerprint {
    let mut digests: Vec<Vec<u8>> = group.alerts.iter().map(alert_digest).collect();
    digests.sort_unstable();

    let mut hasher = Sha256::new();
    update_field(&mut hasher, &group.receiver);
    update_map(&mut hasher, &group.labels);
    hasher.update((digests.len() as u64).to_be_bytes());
    for digest in digests {
        hasher.update(digest);
    }
    finish(hasher)
}
