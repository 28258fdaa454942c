//! In-memory event client for tests and demos

use super::{AccessToken, EventClient};
use crate::error::ClientError;
use crate::event::Event;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Event client serving a configurable list of events
#[derive(Debug, Default)]
pub struct MockEventClient {
    events: Mutex<Vec<Event>>,
    fail_token: Mutex<Option<String>>,
    fail_events: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    token_requests: AtomicUsize,
    last_chunk_size: AtomicUsize,
    /// Tokens handed out so far, in issue order
    issued: Mutex<Vec<String>>,
    /// Number of leading `issued` tokens the backend no longer accepts
    revoked: AtomicUsize,
}

impl MockEventClient {
    /// Create a client serving `events`
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Default::default()
        }
    }

    /// Replace the served events
    pub fn set_events(&self, events: Vec<Event>) {
        *self.events.lock() = events;
    }

    /// Make token requests fail (`None` restores success)
    pub fn fail_token(&self, reason: Option<&str>) {
        *self.fail_token.lock() = reason.map(str::to_string);
    }

    /// Make event listing fail (`None` restores success)
    pub fn fail_events(&self, reason: Option<&str>) {
        *self.fail_events.lock() = reason.map(str::to_string);
    }

    /// Delay every response
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Number of token requests served so far
    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::Relaxed)
    }

    /// Reject every token issued so far, as if the backend revoked them
    pub fn revoke_issued_tokens(&self) {
        let issued = self.issued.lock().len();
        self.revoked.store(issued, Ordering::Relaxed);
    }

    /// Chunk size passed to the last event listing
    pub fn last_chunk_size(&self) -> usize {
        self.last_chunk_size.load(Ordering::Relaxed)
    }

    async fn wait(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl EventClient for MockEventClient {
    async fn create_access_token(
        &self,
        _uri: &str,
        username: &str,
        _password: &str,
    ) -> Result<AccessToken, ClientError> {
        let request = self.token_requests.fetch_add(1, Ordering::Relaxed);
        self.wait().await;
        let failure = self.fail_token.lock().clone();
        if let Some(reason) = failure {
            return Err(ClientError::Unauthorized(reason));
        }
        let access = format!("mock-{}-{}", username, request);
        self.issued.lock().push(access.clone());
        Ok(AccessToken::static_token(&access))
    }

    async fn list_events(
        &self,
        token: &AccessToken,
        namespace: &str,
        chunk_size: usize,
    ) -> Result<Vec<Event>, ClientError> {
        self.last_chunk_size.store(chunk_size, Ordering::Relaxed);
        self.wait().await;
        let revoked = self.revoked.load(Ordering::Relaxed);
        if self.issued.lock()[..revoked].contains(&token.access) {
            return Err(ClientError::Unauthorized("token revoked".to_string()));
        }
        let failure = self.fail_events.lock().clone();
        if let Some(reason) = failure {
            return Err(ClientError::Transport(reason));
        }
        let events: Vec<Event> = self
            .events
            .lock()
            .iter()
            .filter(|e| namespace.is_empty() || e.entity.metadata.namespace == namespace)
            .cloned()
            .collect();
        debug!("Mock client returning {} events for namespace '{}'", events.len(), namespace);
        Ok(events)
    }
}
