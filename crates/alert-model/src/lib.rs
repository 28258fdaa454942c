//! Alert Data Model
//!
//! Alerts, alert groups and label color tables shared by every upstream,
//! plus the fingerprint functions used to identify alerts across sources.

mod alert;
mod color;
pub mod fingerprint;
mod group;

pub use alert::{Alert, AlertState, Silence, SourceInstance};
pub use color::{LabelColors, LabelsColorMap};
pub use fingerprint::Fingerprint;
pub use group::AlertGroup;

use std::collections::BTreeMap;

/// Label set of an alert or group (sorted by key)
pub type Labels = BTreeMap<String, String>;

/// Annotation set of an alert (sorted by key)
pub type Annotations = BTreeMap<String, String>;
