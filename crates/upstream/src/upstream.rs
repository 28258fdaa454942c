//! Upstream Snapshot Store

use crate::client::{AccessToken, EventClient};
use crate::error::{ClientError, UpstreamError};
use crate::event::Event;
use crate::snapshot::{AlertSource, Snapshot, UpstreamHealth, UpstreamStatus};
use crate::{sanitize_uri, ALL_NAMESPACES, DEFAULT_RECEIVER, DEFAULT_TIMEOUT_SECS};
use alert_model::fingerprint::group_id;
use alert_model::{Alert, AlertGroup, AlertState, Annotations, Labels, LabelsColorMap, SourceInstance};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Configuration of one upstream
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Unique name, also the tie-break order when merging
    pub name: String,
    /// Backend URI, unique across the registry
    pub uri: String,
    pub read_only: bool,
    /// Timeout for each credential or event request
    pub timeout: Duration,
    /// Namespaces to list events from
    pub namespaces: Vec<String>,
    /// Page size hint for event listing, 0 for no hint
    pub event_limit: usize,
    pub username: String,
    pub password: String,
    /// Receiver assigned to every alert from this upstream
    pub receiver: String,
}

impl UpstreamConfig {
    /// Config with default timeout, all namespaces and no credentials
    pub fn new(name: &str, uri: &str) -> Self {
        Self {
            name: name.to_string(),
            uri: uri.to_string(),
            read_only: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            namespaces: vec![ALL_NAMESPACES.to_string()],
            event_limit: 0,
            username: String::new(),
            password: String::new(),
            receiver: DEFAULT_RECEIVER.to_string(),
        }
    }

    /// Restrict to the given namespaces; an empty list means all namespaces
    pub fn with_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.namespaces = if namespaces.is_empty() {
            vec![ALL_NAMESPACES.to_string()]
        } else {
            namespaces
        };
        self
    }

    /// Set the request timeout; zero keeps the default
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    pub fn with_event_limit(mut self, limit: usize) -> Self {
        self.event_limit = limit;
        self
    }

    pub fn with_user_pass(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    pub fn with_receiver(mut self, receiver: &str) -> Self {
        self.receiver = receiver.to_string();
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("name", &self.name)
            .field("uri", &sanitize_uri(&self.uri))
            .field("read_only", &self.read_only)
            .field("timeout", &self.timeout)
            .field("namespaces", &self.namespaces)
            .field("event_limit", &self.event_limit)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("receiver", &self.receiver)
            .finish()
    }
}

/// One monitoring backend and its last published snapshot
pub struct Upstream {
    config: UpstreamConfig,
    cluster_id: String,
    client: Arc<dyn EventClient>,
    token: Mutex<Option<AccessToken>>,
    snapshot: RwLock<Arc<Snapshot>>,
    colors: RwLock<LabelsColorMap>,
    health: Mutex<UpstreamHealth>,
}

impl Upstream {
    /// Create an upstream with an empty snapshot
    pub fn new(config: UpstreamConfig, client: Arc<dyn EventClient>) -> Self {
        let cluster_id = group_id(&[&config.uri]);
        debug!("[{}] Created upstream with cluster ID {}", config.name, cluster_id);
        Self {
            config,
            cluster_id,
            client,
            token: Mutex::new(None),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            colors: RwLock::new(LabelsColorMap::new()),
            health: Mutex::new(UpstreamHealth::default()),
        }
    }

    /// Unique upstream name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Backend URI as configured, credentials included
    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    /// Whether the upstream was configured as read-only
    pub fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    /// ID of the cluster this upstream belongs to (digest of its URI)
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Fetch events and publish a new snapshot.
    ///
    /// On failure the previously published alert data stays in place and
    /// only the health fields record the error. A token rejected by the
    /// backend is dropped so the next pull requests a new one.
    pub async fn pull(&self) -> Result<(), UpstreamError> {
        let start = Instant::now();
        match self.build_snapshot().await {
            Ok(snapshot) => {
                let groups = snapshot.alert_groups.len();
                let events = snapshot.event_count;
                *self.snapshot.write() = Arc::new(snapshot);
                self.colors.write().clear();
                *self.health.lock() = UpstreamHealth {
                    status: UpstreamStatus::Healthy,
                    last_error: None,
                    last_success: Some(Utc::now()),
                };

                metrics::counter!("upstream_pulls_total", "upstream" => self.config.name.clone(), "result" => "ok")
                    .increment(1);
                metrics::gauge!("upstream_alert_groups", "upstream" => self.config.name.clone()).set(groups as f64);
                info!(
                    "[{}] Got {} unhealthy event(s) in {:?}, {} alert group(s)",
                    self.config.name,
                    events,
                    start.elapsed(),
                    groups
                );
                Ok(())
            }
            Err(e) => {
                error!("{}", e);
                {
                    let mut health = self.health.lock();
                    health.status = UpstreamStatus::Failed;
                    health.last_error = Some(e.to_string());
                }
                metrics::counter!("upstream_pulls_total", "upstream" => self.config.name.clone(), "result" => "error")
                    .increment(1);
                Err(e)
            }
        }
    }

    async fn build_snapshot(&self) -> Result<Snapshot, UpstreamError> {
        let token = self.ensure_credentials().await?;

        let mut events = Vec::new();
        for namespace in &self.config.namespaces {
            let listed = tokio::time::timeout(
                self.config.timeout,
                self.client.list_events(&token, namespace, self.config.event_limit),
            )
            .await
            .map_err(|_| self.timeout_error("listing events"))?
            .map_err(|source| self.fetch_error(namespace, source))?;
            events.extend(listed);
        }

        let total = events.len();
        events.retain(|e| !e.is_healthy());
        debug!("[{}] {} of {} event(s) are unhealthy", self.config.name, events.len(), total);

        let mut known_labels = BTreeSet::new();
        let mut groups = Vec::with_capacity(events.len());
        for event in &events {
            let group = self.event_to_group(event);
            known_labels.extend(group.labels.keys().cloned());
            groups.push(group);
        }

        Ok(Snapshot {
            alert_groups: groups,
            known_labels: known_labels.into_iter().collect(),
            silences: BTreeMap::new(),
            event_count: events.len(),
        })
    }

    /// Return a valid access token, requesting a new one when needed
    async fn ensure_credentials(&self) -> Result<AccessToken, UpstreamError> {
        let cached = self.token.lock().clone();
        if let Some(token) = cached {
            if !token.is_expired() {
                return Ok(token);
            }
            debug!("[{}] Access token expired, requesting a new one", self.config.name);
        }

        let token = tokio::time::timeout(
            self.config.timeout,
            self.client
                .create_access_token(&self.config.uri, &self.config.username, &self.config.password),
        )
        .await
        .map_err(|_| {
            warn!("[{}] Timeout from {}", self.config.name, sanitize_uri(&self.config.uri));
            self.timeout_error("access token request")
        })?
        .map_err(|source| UpstreamError::Credential {
            upstream: self.config.name.clone(),
            source,
        })?;

        *self.token.lock() = Some(token.clone());
        Ok(token)
    }

    /// Map a listing failure; a rejected token is forgotten and reported as a credential error
    fn fetch_error(&self, namespace: &str, source: ClientError) -> UpstreamError {
        if let ClientError::Unauthorized(_) = source {
            warn!("[{}] Access token rejected, requesting a new one on the next pull", self.config.name);
            *self.token.lock() = None;
            return UpstreamError::Credential {
                upstream: self.config.name.clone(),
                source,
            };
        }
        UpstreamError::Fetch {
            upstream: self.config.name.clone(),
            namespace: namespace.to_string(),
            source,
        }
    }

    fn timeout_error(&self, operation: &'static str) -> UpstreamError {
        UpstreamError::Timeout {
            upstream: self.config.name.clone(),
            operation,
            timeout_ms: self.config.timeout.as_millis() as u64,
        }
    }

    fn event_to_group(&self, event: &Event) -> AlertGroup {
        let entity = &event.entity.metadata;
        let check = &event.check.metadata;

        let mut labels: Labels = entity.labels.clone();
        labels.insert("check.name".to_string(), check.name.clone());
        labels.insert("namespace".to_string(), entity.namespace.clone());
        labels.insert("entity.name".to_string(), entity.name.clone());

        let state = event_state(event);
        let starts_at = unix_time(event.starts_at());

        let mut source = SourceInstance::new(&self.config.name, &self.cluster_id, state, starts_at);
        source.silenced_by = event.check.silenced.clone();

        let mut alert = Alert::new(labels.clone(), state, starts_at, &self.config.receiver);
        alert.annotations = Annotations::from([
            ("description".to_string(), event.check.output.clone()),
            ("summary".to_string(), format!("failing: {}", check.name)),
        ]);
        alert.silenced_by = event.check.silenced.clone();
        alert.sources.push(source);

        let id = group_id(&[&entity.name, &entity.namespace, &check.name, &check.namespace]);
        let mut group = AlertGroup::new(&id, &self.config.receiver, labels);
        group.alerts.push(alert);
        group.upstream_counts.insert(self.config.name.clone(), 1);
        group.latest_starts_at = unix_time(event.check.issued);
        group.update_hash();
        group
    }

    /// Install a precomputed color table, cleared by the next successful pull
    pub fn replace_colors(&self, colors: LabelsColorMap) {
        *self.colors.write() = colors;
    }

    /// Current snapshot; the lock is released before this returns
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Copy of the current health
    pub fn health(&self) -> UpstreamHealth {
        self.health.lock().clone()
    }
}

impl AlertSource for Upstream {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn alerts(&self) -> Vec<AlertGroup> {
        self.snapshot().alert_groups.clone()
    }

    fn colors(&self) -> LabelsColorMap {
        self.colors.read().clone()
    }

    fn known_labels(&self) -> Vec<String> {
        self.snapshot().known_labels.clone()
    }
}

impl fmt::Debug for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upstream")
            .field("config", &self.config)
            .field("cluster_id", &self.cluster_id)
            .finish_non_exhaustive()
    }
}

/// Map a check result onto an alert state
fn event_state(event: &Event) -> AlertState {
    if event.check.is_silenced {
        return AlertState::Suppressed;
    }
    match event.check.state.as_str() {
        "failing" | "flapping" => AlertState::Active,
        _ => AlertState::Unprocessed,
    }
}

fn unix_time(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
