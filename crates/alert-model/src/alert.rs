//! Alert and per-source instance records

use crate::fingerprint::{self, Fingerprint};
use crate::{Annotations, Labels};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// State of an alert as reported by an upstream.
///
/// Variants are declared in ascending precedence: when several instances
/// report different states for the same alert, the greatest one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// Not yet routed by the upstream
    #[default]
    Unprocessed,
    /// Silenced or inhibited
    Suppressed,
    /// Firing
    Active,
}

impl AlertState {
    /// Resolve the state of a merged alert from every reported state.
    ///
    /// An empty history resolves to `Unprocessed`.
    pub fn resolve<I>(states: I) -> Self
    where
        I: IntoIterator<Item = AlertState>,
    {
        states.into_iter().max().unwrap_or_default()
    }

    /// Lowercase name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Unprocessed => "unprocessed",
            AlertState::Suppressed => "suppressed",
            AlertState::Active => "active",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Silence record tracked per source instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Silence {
    /// Silence ID on the upstream that owns it
    pub id: String,
    /// Author of the silence
    pub created_by: String,
    pub comment: String,
    /// Start of the silenced window
    pub starts_at: DateTime<Utc>,
    /// End of the silenced window
    pub ends_at: DateTime<Utc>,
}

/// Upstream instance an alert was collected from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInstance {
    /// Upstream name
    pub name: String,
    /// Cluster ID of the upstream (digest of its URI)
    pub cluster: String,
    /// Per-instance alert state
    pub state: AlertState,
    /// Start time seen by this instance; the alert itself carries the minimum
    pub starts_at: DateTime<Utc>,
    /// Link to the alert source on this instance
    #[serde(default)]
    pub source: String,
    /// Silences matching the alert on this instance, internal only
    #[serde(skip)]
    pub silences: BTreeMap<String, Silence>,
    /// IDs of the silences muting the alert on this instance
    pub silenced_by: Vec<String>,
    /// Fingerprints of the alerts inhibiting this one on this instance
    pub inhibited_by: Vec<String>,
}

impl SourceInstance {
    /// Create an instance record with no silences or inhibitions
    pub fn new(name: &str, cluster: &str, state: AlertState, starts_at: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            cluster: cluster.to_string(),
            state,
            starts_at,
            source: String::new(),
            silences: BTreeMap::new(),
            silenced_by: Vec::new(),
            inhibited_by: Vec::new(),
        }
    }
}

/// One observed incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Identity of the alert; only changed through `set_labels`
    labels: Labels,
    /// Free-form descriptive text, not part of the identity
    pub annotations: Annotations,
    /// Merged state across all sources
    pub state: AlertState,
    /// Earliest start time across all sources
    pub starts_at: DateTime<Utc>,
    /// Receiver the alert was routed to
    pub receiver: String,
    /// One record per upstream that reported the alert
    pub sources: Vec<SourceInstance>,
    /// IDs of the silences muting the alert
    pub silenced_by: Vec<String>,
    /// Fingerprints of the alerts inhibiting this one
    pub inhibited_by: Vec<String>,
    /// Cached label fingerprint, kept in sync with `labels`
    #[serde(rename = "labelsFP")]
    fingerprint: Fingerprint,
}

impl Alert {
    /// Create an alert with no sources and its label fingerprint computed
    pub fn new(labels: Labels, state: AlertState, starts_at: DateTime<Utc>, receiver: &str) -> Self {
        let fingerprint = fingerprint::label_fingerprint(&labels);
        Self {
            labels,
            annotations: Annotations::new(),
            state,
            starts_at,
            receiver: receiver.to_string(),
            sources: Vec::new(),
            silenced_by: Vec::new(),
            inhibited_by: Vec::new(),
            fingerprint,
        }
    }

    /// Label set identifying this alert
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Label fingerprint identifying this alert across upstreams
    pub fn label_fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Replace the label set and recompute the fingerprint
    pub fn set_labels(&mut self, labels: Labels) {
        self.fingerprint = fingerprint::label_fingerprint(&labels);
        self.labels = labels;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_state_precedence() {
        use AlertState::*;
        assert_eq!(AlertState::resolve([Suppressed, Active]), Active);
        assert_eq!(AlertState::resolve([Unprocessed, Suppressed]), Suppressed);
        assert_eq!(AlertState::resolve([Unprocessed]), Unprocessed);
        assert_eq!(AlertState::resolve(Vec::new()), Unprocessed);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&AlertState::Suppressed).unwrap();
        assert_eq!(json, "\"suppressed\"");
        let state: AlertState = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(state, AlertState::Active);
    }

    #[test]
    fn test_fingerprint_ignores_everything_but_labels() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut a = Alert::new(labels(&[("env", "prod")]), AlertState::Active, ts, "ops");
        let before = a.label_fingerprint().clone();

        a.annotations.insert("summary".to_string(), "disk full".to_string());
        a.state = AlertState::Suppressed;
        a.sources.push(SourceInstance::new("a", "c1", AlertState::Active, ts));
        assert_eq!(a.label_fingerprint(), &before);

        a.set_labels(labels(&[("env", "dev")]));
        assert_ne!(a.label_fingerprint(), &before);
    }

    #[test]
    fn test_set_labels_matches_fresh_alert() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let fresh = Alert::new(labels(&[("host", "web1")]), AlertState::Active, ts, "ops");
        let mut relabeled = Alert::new(Labels::new(), AlertState::Active, ts, "ops");
        relabeled.set_labels(labels(&[("host", "web1")]));

        assert_eq!(relabeled.labels(), fresh.labels());
        assert_eq!(relabeled.label_fingerprint(), fresh.label_fingerprint());
    }

    #[test]
    fn test_silences_not_serialized() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let mut src = SourceInstance::new("a", "c1", AlertState::Suppressed, ts);
        src.silences.insert(
            "s1".to_string(),
            Silence {
                id: "s1".to_string(),
                created_by: "me".to_string(),
                comment: "maintenance".to_string(),
                starts_at: ts,
                ends_at: ts,
            },
        );
        let json = serde_json::to_value(&src).unwrap();
        assert!(json.get("silences").is_none());
        assert!(json.get("silencedBy").is_some());
    }
}
