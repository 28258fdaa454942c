//! Filtering Policy
//!
//! Decides which receivers are dropped and which labels and annotations
//! remain visible, based on keep (allow) and strip (deny) lists.

mod config;
mod policy;

pub use config::{FilterConfig, KeepStrip};
pub use policy::{filter_annotations, filter_labels, should_strip_receiver};
