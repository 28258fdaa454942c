//! Published per-upstream state

use alert_model::{AlertGroup, LabelsColorMap, Silence};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of the most recent pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamStatus {
    /// No pull has completed yet
    #[default]
    Pending,
    Healthy,
    Failed,
}

/// Health of an upstream, available for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamHealth {
    /// Outcome of the most recent pull
    pub status: UpstreamStatus,
    /// Error of the most recent pull, cleared on success
    pub last_error: Option<String>,
    /// Time of the last successful pull
    pub last_success: Option<DateTime<Utc>>,
}

/// Result of the last successful pull.
///
/// Published as a whole; readers never see a partially updated snapshot.
/// Health and colors live beside it so updating them never copies the alerts.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// One group per unhealthy event
    pub alert_groups: Vec<AlertGroup>,
    /// Label keys seen on any alert group, sorted
    pub known_labels: Vec<String>,
    /// Silences by ID
    pub silences: BTreeMap<String, Silence>,
    /// Number of unhealthy events the groups were built from
    pub event_count: usize,
}

/// Read access to one upstream's published data, as used by the merge engine
pub trait AlertSource {
    /// Unique upstream name
    fn name(&self) -> &str;

    /// Copy of the current alert groups
    fn alerts(&self) -> Vec<AlertGroup>;

    /// Copy of the current color table
    fn colors(&self) -> LabelsColorMap;

    /// Copy of the known label keys
    fn known_labels(&self) -> Vec<String>;
}

impl<T: AlertSource + ?Sized> AlertSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn alerts(&self) -> Vec<AlertGroup> {
        (**self).alerts()
    }

    fn colors(&self) -> LabelsColorMap {
        (**self).colors()
    }

    fn known_labels(&self) -> Vec<String> {
        (**self).known_labels()
    }
}
