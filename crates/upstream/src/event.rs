//! Raw events as returned by an upstream's event API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Object metadata shared by entities and checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
}

/// Monitored entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub metadata: ObjectMeta,
}

/// Check result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Check {
    pub metadata: ObjectMeta,
    /// Exit status, 0 means healthy
    pub status: u32,
    /// `passing`, `failing` or `flapping`
    pub state: String,
    pub output: String,
    /// Unix timestamp of this execution
    pub issued: i64,
    /// Unix timestamp of the last passing execution, 0 if never
    pub last_ok: i64,
    pub is_silenced: bool,
    /// IDs of the silences matching this check
    pub silenced: Vec<String>,
}

/// One check result for one entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub entity: Entity,
    pub check: Check,
}

impl Event {
    /// Whether the check reports a non-alerting status
    pub fn is_healthy(&self) -> bool {
        self.check.status == 0
    }

    /// Start of the incident: last passing run if known, else this run
    pub fn starts_at(&self) -> i64 {
        if self.check.last_ok != 0 {
            self.check.last_ok
        } else {
            self.check.issued
        }
    }
}
