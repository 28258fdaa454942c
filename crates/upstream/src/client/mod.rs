//! Event client seam
//!
//! An [`EventClient`] speaks one backend's wire protocol. The upstream only
//! needs two operations from it: obtaining an access token and listing the
//! events of a namespace.

mod file;
mod mock;

pub use file::FileEventClient;
pub use mock::MockEventClient;

use crate::error::ClientError;
use crate::event::Event;
use async_trait::async_trait;
use chrono::Utc;

/// Access credential issued by an upstream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessToken {
    /// Bearer credential sent with every request
    pub access: String,
    /// Unix timestamp after which the token is invalid, 0 if it never expires
    pub expires_at: i64,
}

impl AccessToken {
    /// Token without expiry
    pub fn static_token(access: &str) -> Self {
        Self {
            access: access.to_string(),
            expires_at: 0,
        }
    }

    /// Whether a new token must be requested before the next call
    pub fn is_expired(&self) -> bool {
        self.access.is_empty() || (self.expires_at > 0 && Utc::now().timestamp() >= self.expires_at)
    }
}

/// Client for one upstream's event API
#[async_trait]
pub trait EventClient: Send + Sync {
    /// Exchange username and password for an access token
    async fn create_access_token(
        &self,
        uri: &str,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, ClientError>;

    /// List events in `namespace` (empty for all namespaces).
    ///
    /// `chunk_size` is a page size hint, 0 lets the client decide.
    async fn list_events(
        &self,
        token: &AccessToken,
        namespace: &str,
        chunk_size: usize,
    ) -> Result<Vec<Event>, ClientError>;
}
