//! Label color tables

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Colors assigned to one label value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelColors {
    /// CSS background color
    pub background: String,
    /// Perceived brightness (0-255), used to pick the text color
    pub brightness: i32,
}

impl LabelColors {
    /// Colors with the given background and brightness
    pub fn new(background: &str, brightness: i32) -> Self {
        Self {
            background: background.to_string(),
            brightness,
        }
    }
}

/// Label name -> label value -> colors
pub type LabelsColorMap = BTreeMap<String, BTreeMap<String, LabelColors>>;
