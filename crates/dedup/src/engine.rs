//! Merge Engine Implementation

use alert_model::fingerprint::label_fingerprint;
use alert_model::{Alert, AlertGroup, AlertState, Fingerprint, LabelsColorMap};
use filter_policy::{filter_annotations, filter_labels, should_strip_receiver, FilterConfig};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, trace};
use upstream::{AlertSource, UpstreamRegistry};

/// Merged representative of one label fingerprint plus every state reported for it
struct MergedAlert {
    alert: Alert,
    states: Vec<AlertState>,
}

/// Deduplicate the alert groups of every upstream.
///
/// `upstreams` must be in registry order (ascending name): it decides which
/// copy of a group provides the group-level fields and which alert provides
/// labels and annotations. Groups are returned ordered by group ID, alerts
/// by label fingerprint, sources by upstream name.
pub fn dedup_alerts<S: AlertSource>(upstreams: &[S], filters: &FilterConfig) -> Vec<AlertGroup> {
    let mut buckets: BTreeMap<String, Vec<AlertGroup>> = BTreeMap::new();
    for upstream in upstreams {
        let groups = upstream.alerts();
        debug!("[{}] Collected {} alert group(s) for deduplication", upstream.name(), groups.len());
        for group in groups {
            buckets.entry(group.id.clone()).or_default().push(group);
        }
    }

    let mut deduped = Vec::with_capacity(buckets.len());
    for (id, copies) in buckets {
        match merge_group(copies, filters) {
            Some(group) => deduped.push(group),
            None => trace!("Dropping alert group {} with no visible alerts", id),
        }
    }
    deduped
}

fn merge_group(copies: Vec<AlertGroup>, filters: &FilterConfig) -> Option<AlertGroup> {
    let receivers = &filters.receivers;
    let mut merged: BTreeMap<Fingerprint, MergedAlert> = BTreeMap::new();
    let mut template: Option<AlertGroup> = None;

    for mut copy in copies {
        let alerts = std::mem::take(&mut copy.alerts);
        if template.is_none() {
            template = Some(copy);
        }

        for alert in alerts {
            if should_strip_receiver(&receivers.keep, &receivers.strip, &alert.receiver) {
                continue;
            }
            // keyed on the label set itself, whatever fingerprint the source cached
            match merged.entry(label_fingerprint(alert.labels())) {
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    if alert.starts_at < existing.alert.starts_at {
                        existing.alert.starts_at = alert.starts_at;
                    }
                    existing.states.push(alert.state);
                    existing.alert.sources.extend(alert.sources);
                }
                Entry::Vacant(entry) => {
                    let state = alert.state;
                    entry.insert(MergedAlert {
                        alert,
                        states: vec![state],
                    });
                }
            }
        }
    }

    if merged.is_empty() {
        return None;
    }

    let mut group = template?;
    group.alerts = merged
        .into_values()
        .map(|m| finalize_alert(m, filters))
        .collect();
    group.update_hash();
    Some(group)
}

fn finalize_alert(merged: MergedAlert, filters: &FilterConfig) -> Alert {
    let MergedAlert { mut alert, states } = merged;

    let labels = filter_labels(&filters.labels.keep, &filters.labels.strip, alert.labels());
    alert.set_labels(labels);
    alert.annotations = filter_annotations(
        &filters.annotations.keep,
        &filters.annotations.strip,
        &alert.annotations,
    );
    alert.state = AlertState::resolve(states);
    alert.sources.sort_by(|a, b| a.name.cmp(&b.name));
    alert
}

/// Merge every upstream's color table; the first upstream (by name) defining
/// a label value keeps its colors
pub fn dedup_colors<S: AlertSource>(upstreams: &[S]) -> LabelsColorMap {
    let mut deduped = LabelsColorMap::new();
    for upstream in upstreams {
        for (label, values) in upstream.colors() {
            let merged = deduped.entry(label).or_default();
            for (value, colors) in values {
                merged.entry(value).or_insert(colors);
            }
        }
    }
    deduped
}

/// Union of every upstream's known label keys, sorted
pub fn dedup_known_labels<S: AlertSource>(upstreams: &[S]) -> Vec<String> {
    let mut labels = BTreeSet::new();
    for upstream in upstreams {
        labels.extend(upstream.known_labels());
    }
    labels.into_iter().collect()
}

/// Merge engine bound to a registry and a filter configuration
#[derive(Debug, Clone)]
pub struct DedupEngine {
    registry: Arc<UpstreamRegistry>,
    filters: FilterConfig,
}

impl DedupEngine {
    /// Create an engine merging every upstream of `registry` through `filters`
    pub fn new(registry: Arc<UpstreamRegistry>, filters: FilterConfig) -> Self {
        Self { registry, filters }
    }

    /// Registry the engine reads snapshots from
    pub fn registry(&self) -> &UpstreamRegistry {
        &self.registry
    }

    /// Deduplicated alert groups across all registered upstreams
    pub fn dedup_alerts(&self) -> Vec<AlertGroup> {
        let groups = dedup_alerts(&self.registry.list_upstreams(), &self.filters);
        metrics::gauge!("dedup_alert_groups").set(groups.len() as f64);
        groups
    }

    /// Merged color table across all registered upstreams
    pub fn dedup_colors(&self) -> LabelsColorMap {
        dedup_colors(&self.registry.list_upstreams())
    }

    /// Known label keys across all registered upstreams
    pub fn dedup_known_labels(&self) -> Vec<String> {
        dedup_known_labels(&self.registry.list_upstreams())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_model::{Labels, LabelColors, SourceInstance};
    use chrono::{DateTime, TimeZone, Utc};
    use filter_policy::KeepStrip;

    struct StaticSource {
        name: String,
        groups: Vec<AlertGroup>,
        colors: LabelsColorMap,
        labels: Vec<String>,
    }

    impl StaticSource {
        fn new(name: &str, groups: Vec<AlertGroup>) -> Self {
            Self {
                name: name.to_string(),
                groups,
                colors: LabelsColorMap::new(),
                labels: Vec::new(),
            }
        }
    }

    impl AlertSource for StaticSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn alerts(&self) -> Vec<AlertGroup> {
            self.groups.clone()
        }

        fn colors(&self) -> LabelsColorMap {
            self.colors.clone()
        }

        fn known_labels(&self) -> Vec<String> {
            self.labels.clone()
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn alert(upstream: &str, pairs: &[(&str, &str)], state: AlertState, start: i64, receiver: &str) -> Alert {
        let mut alert = Alert::new(labels(pairs), state, ts(start), receiver);
        alert
            .annotations
            .insert("summary".to_string(), format!("from {}", upstream));
        alert
            .sources
            .push(SourceInstance::new(upstream, &format!("cluster-{}", upstream), state, ts(start)));
        alert
    }

    fn group(id: &str, upstream: &str, alerts: Vec<Alert>) -> AlertGroup {
        let mut group = AlertGroup::new(id, "ops", labels(&[("group", id)]));
        group.upstream_counts.insert(upstream.to_string(), alerts.len());
        group.alerts = alerts;
        group.update_hash();
        group
    }

    fn source(name: &str, state: AlertState, start: i64) -> StaticSource {
        StaticSource::new(
            name,
            vec![group("g1", name, vec![alert(name, &[("host", "web1")], state, start, "ops")])],
        )
    }

    #[test]
    fn test_state_precedence() {
        use AlertState::*;
        let cases = [
            (Suppressed, Active, Active),
            (Active, Suppressed, Active),
            (Suppressed, Unprocessed, Suppressed),
            (Unprocessed, Suppressed, Suppressed),
            (Unprocessed, Unprocessed, Unprocessed),
        ];
        for (a, b, expected) in cases {
            let upstreams = [source("a", a, 100), source("b", b, 100)];
            let groups = dedup_alerts(&upstreams, &FilterConfig::default());
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].alerts.len(), 1);
            assert_eq!(groups[0].alerts[0].state, expected, "{:?} + {:?}", a, b);
        }
    }

    #[test]
    fn test_merge_sources_and_earliest_start() {
        let upstreams = [
            source("b", AlertState::Active, 200),
            source("a", AlertState::Unprocessed, 300),
        ];
        let groups = dedup_alerts(&upstreams, &FilterConfig::default());
        let merged = &groups[0].alerts[0];
        assert_eq!(merged.starts_at, ts(200));
        let names: Vec<&str> = merged.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_first_seen_wins_for_annotations_and_group_fields() {
        let upstreams = [source("a", AlertState::Active, 100), source("b", AlertState::Active, 50)];
        let groups = dedup_alerts(&upstreams, &FilterConfig::default());
        let group = &groups[0];
        assert_eq!(group.alerts[0].annotations["summary"], "from a");
        assert_eq!(group.upstream_counts.get("a"), Some(&1));
        assert_eq!(group.upstream_counts.get("b"), None);
    }

    #[test]
    fn test_distinct_labels_stay_separate() {
        let upstreams = [
            StaticSource::new(
                "a",
                vec![group("g1", "a", vec![alert("a", &[("host", "web1")], AlertState::Active, 100, "ops")])],
            ),
            StaticSource::new(
                "b",
                vec![group("g1", "b", vec![alert("b", &[("host", "web2")], AlertState::Active, 100, "ops")])],
            ),
        ];
        let groups = dedup_alerts(&upstreams, &FilterConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].alerts.len(), 2);
        let mut fps: Vec<&Fingerprint> = groups[0].alerts.iter().map(|a| a.label_fingerprint()).collect();
        let sorted = {
            let mut s = fps.clone();
            s.sort();
            s
        };
        assert_eq!(fps, sorted);
        fps.dedup();
        assert_eq!(fps.len(), 2);
    }

    #[test]
    fn test_stripped_receiver_has_no_influence() {
        let upstreams = [
            StaticSource::new(
                "a",
                vec![group("g1", "a", vec![alert("a", &[("host", "web1")], AlertState::Active, 10, "blackhole")])],
            ),
            StaticSource::new(
                "b",
                vec![group("g1", "b", vec![alert("b", &[("host", "web1")], AlertState::Suppressed, 100, "ops")])],
            ),
        ];
        let filters = FilterConfig {
            receivers: KeepStrip::strip(["blackhole"]),
            ..Default::default()
        };
        let groups = dedup_alerts(&upstreams, &filters);
        let merged = &groups[0].alerts[0];
        assert_eq!(merged.state, AlertState::Suppressed);
        assert_eq!(merged.starts_at, ts(100));
        assert_eq!(merged.sources.len(), 1);
        assert_eq!(merged.receiver, "ops");
        // group template still comes from the first copy of the group
        assert_eq!(groups[0].upstream_counts.get("a"), Some(&1));
    }

    #[test]
    fn test_empty_group_dropped() {
        let upstreams = [
            StaticSource::new(
                "a",
                vec![
                    group("g1", "a", vec![alert("a", &[("host", "web1")], AlertState::Active, 10, "blackhole")]),
                    group("g2", "a", vec![alert("a", &[("host", "web2")], AlertState::Active, 10, "ops")]),
                    group("g3", "a", Vec::new()),
                ],
            ),
        ];
        let filters = FilterConfig {
            receivers: KeepStrip::keep(["ops"]),
            ..Default::default()
        };
        let groups = dedup_alerts(&upstreams, &filters);
        let ids: Vec<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g2"]);
    }

    #[test]
    fn test_label_and_annotation_filtering() {
        let upstreams = [StaticSource::new(
            "a",
            vec![group(
                "g1",
                "a",
                vec![alert("a", &[("host", "web1"), ("instance", "10.0.0.1:9100")], AlertState::Active, 10, "ops")],
            )],
        )];
        let filters = FilterConfig {
            labels: KeepStrip::strip(["instance"]),
            annotations: KeepStrip::keep(["description"]),
            ..Default::default()
        };
        let groups = dedup_alerts(&upstreams, &filters);
        let merged = &groups[0].alerts[0];
        assert_eq!(merged.labels(), &labels(&[("host", "web1")]));
        assert!(merged.annotations.is_empty());
        assert_eq!(
            merged.label_fingerprint(),
            &alert_model::fingerprint::label_fingerprint(merged.labels())
        );
    }

    #[test]
    fn test_stale_cached_fingerprint_still_merges() {
        let fresh = alert("a", &[("host", "web1")], AlertState::Active, 100, "ops");

        // same labels, but the cached fingerprint came from elsewhere
        let mut json = serde_json::to_value(alert("b", &[("host", "web1")], AlertState::Suppressed, 50, "ops")).unwrap();
        json["labelsFP"] = serde_json::Value::String("stale".to_string());
        let stale: Alert = serde_json::from_value(json).unwrap();
        assert_ne!(stale.label_fingerprint(), fresh.label_fingerprint());

        let mut relabeled = alert("c", &[], AlertState::Unprocessed, 75, "ops");
        relabeled.set_labels(labels(&[("host", "web1")]));

        let upstreams = [
            StaticSource::new("a", vec![group("g1", "a", vec![fresh])]),
            StaticSource::new("b", vec![group("g1", "b", vec![stale])]),
            StaticSource::new("c", vec![group("g1", "c", vec![relabeled])]),
        ];
        let groups = dedup_alerts(&upstreams, &FilterConfig::default());
        assert_eq!(groups[0].alerts.len(), 1);

        let merged = &groups[0].alerts[0];
        assert_eq!(merged.sources.len(), 3);
        assert_eq!(merged.starts_at, ts(50));
        assert_eq!(merged.state, AlertState::Active);
        assert_eq!(merged.label_fingerprint(), &label_fingerprint(merged.labels()));
    }

    #[test]
    fn test_content_fingerprint_recomputed() {
        let upstreams = [source("a", AlertState::Unprocessed, 100), source("b", AlertState::Active, 100)];
        let groups = dedup_alerts(&upstreams, &FilterConfig::default());
        assert_eq!(groups[0].hash, groups[0].content_fingerprint());
        assert_ne!(groups[0].hash, upstreams[0].groups[0].hash);
    }

    #[test]
    fn test_idempotent() {
        let upstreams = [source("a", AlertState::Unprocessed, 100), source("b", AlertState::Active, 50)];
        let first = dedup_alerts(&upstreams, &FilterConfig::default());
        let second = dedup_alerts(&upstreams, &FilterConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_upstreams() {
        let upstreams: [StaticSource; 0] = [];
        assert!(dedup_alerts(&upstreams, &FilterConfig::default()).is_empty());
        assert!(dedup_colors(&upstreams).is_empty());
        assert!(dedup_known_labels(&upstreams).is_empty());
    }

    #[test]
    fn test_color_precedence() {
        let mut a = StaticSource::new("a", Vec::new());
        a.colors
            .entry("env".to_string())
            .or_default()
            .insert("prod".to_string(), LabelColors::new("red", 76));
        let mut b = StaticSource::new("b", Vec::new());
        b.colors
            .entry("env".to_string())
            .or_default()
            .insert("prod".to_string(), LabelColors::new("blue", 29));
        b.colors
            .entry("env".to_string())
            .or_default()
            .insert("dev".to_string(), LabelColors::new("green", 150));

        let colors = dedup_colors(&[a, b]);
        assert_eq!(colors["env"]["prod"], LabelColors::new("red", 76));
        assert_eq!(colors["env"]["dev"], LabelColors::new("green", 150));
    }

    #[test]
    fn test_known_labels_union() {
        let mut a = StaticSource::new("a", Vec::new());
        a.labels = vec!["env".to_string(), "host".to_string()];
        let mut b = StaticSource::new("b", Vec::new());
        b.labels = vec!["host".to_string(), "check.name".to_string()];

        assert_eq!(dedup_known_labels(&[a, b]), vec!["check.name", "env", "host"]);
    }
}
