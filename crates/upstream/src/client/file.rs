//! Event client reading a JSON dump of events from disk

use super::{AccessToken, EventClient};
use crate::error::ClientError;
use crate::event::Event;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serves events from a JSON array stored in a file.
///
/// The file is re-read on every listing, so replacing it changes what the
/// next pull sees.
#[derive(Debug, Clone)]
pub struct FileEventClient {
    path: PathBuf,
}

impl FileEventClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Build a client from a `file://` URI or a plain path
    pub fn from_uri(uri: &str) -> Self {
        Self::new(uri.strip_prefix("file://").unwrap_or(uri))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventClient for FileEventClient {
    async fn create_access_token(
        &self,
        _uri: &str,
        _username: &str,
        _password: &str,
    ) -> Result<AccessToken, ClientError> {
        Ok(AccessToken::static_token("file"))
    }

    async fn list_events(
        &self,
        _token: &AccessToken,
        namespace: &str,
        _chunk_size: usize,
    ) -> Result<Vec<Event>, ClientError> {
        let raw = tokio::fs::read(&self.path).await?;
        let events: Vec<Event> = serde_json::from_slice(&raw)?;
        debug!("Read {} events from {}", events.len(), self.path.display());
        Ok(events
            .into_iter()
            .filter(|e| namespace.is_empty() || e.entity.metadata.namespace == namespace)
            .collect())
    }
}
