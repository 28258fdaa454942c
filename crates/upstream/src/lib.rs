//! Upstream Snapshot Store and Registry
//!
//! Each configured monitoring backend ("upstream") periodically pulls its
//! events through an [`EventClient`], converts unhealthy events into alert
//! groups and publishes them as an immutable [`Snapshot`]. The
//! [`UpstreamRegistry`] holds every configured upstream, enumerated in
//! ascending name order.

pub mod client;
mod error;
mod event;
mod registry;
mod snapshot;
mod upstream;
mod uri;

pub use client::{AccessToken, EventClient};
pub use error::{ClientError, RegistryError, UpstreamError};
pub use event::{Check, Entity, Event, ObjectMeta};
pub use registry::UpstreamRegistry;
pub use snapshot::{AlertSource, Snapshot, UpstreamHealth, UpstreamStatus};
pub use upstream::{Upstream, UpstreamConfig};
pub use uri::sanitize_uri;

/// Namespace scope meaning "every namespace"
pub const ALL_NAMESPACES: &str = "";

/// Default timeout for credential and event requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Receiver assigned to alerts when none is configured
pub const DEFAULT_RECEIVER: &str = "sensu";
