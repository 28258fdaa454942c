//! Alert Deduplication Engine
//!
//! Merges the snapshots of every registered upstream into one view:
//! deduplicated alert groups, a merged color table and the union of known
//! label keys. Upstreams are always visited in ascending name order, which
//! decides every first-wins tie-break.

mod engine;

pub use engine::{dedup_alerts, dedup_colors, dedup_known_labels, DedupEngine};
