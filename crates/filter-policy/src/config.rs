//! Filter configuration

use serde::{Deserialize, Serialize};

/// Allow-list / deny-list pair
///
/// A non-empty `keep` list only lets its entries through. A non-empty
/// `strip` list drops its entries. Both empty lets everything through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepStrip {
    pub keep: Vec<String>,
    pub strip: Vec<String>,
}

impl KeepStrip {
    /// Only keep the given entries
    pub fn keep<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keep: entries.into_iter().map(Into::into).collect(),
            strip: Vec::new(),
        }
    }

    /// Drop the given entries
    pub fn strip<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keep: Vec::new(),
            strip: entries.into_iter().map(Into::into).collect(),
        }
    }
}

/// Filtering applied to merged alerts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Alerts routed to rejected receivers are dropped entirely
    pub receivers: KeepStrip,
    /// Label keys visible in merged output
    pub labels: KeepStrip,
    /// Annotation keys visible in merged output
    pub annotations: KeepStrip,
}
