//! Keep/strip policy functions

use std::collections::BTreeMap;
use tracing::trace;

fn is_stripped(keep: &[String], strip: &[String], name: &str) -> bool {
    if !strip.is_empty() && strip.iter().any(|s| s == name) {
        return true;
    }
    !keep.is_empty() && !keep.iter().any(|k| k == name)
}

/// Whether alerts for `receiver` should be dropped
pub fn should_strip_receiver(keep: &[String], strip: &[String], receiver: &str) -> bool {
    let stripped = is_stripped(keep, strip, receiver);
    if stripped {
        trace!("Stripping receiver {}", receiver);
    }
    stripped
}

fn filter_map(
    keep: &[String],
    strip: &[String],
    map: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    map.iter()
        .filter(|(key, _)| !is_stripped(keep, strip, key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Labels left visible after applying keep/strip lists to their keys
pub fn filter_labels(
    keep: &[String],
    strip: &[String],
    labels: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    filter_map(keep, strip, labels)
}

/// Annotations left visible after applying keep/strip lists to their keys
pub fn filter_annotations(
    keep: &[String],
    strip: &[String],
    annotations: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    filter_map(keep, strip, annotations)
}
