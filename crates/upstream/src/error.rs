//! Upstream Error Types

use thiserror::Error;

/// Errors returned by an event client implementation
#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials were rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Response could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Errors that abort a pull; the previous snapshot stays published
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Access token could not be created, or the backend rejected it
    #[error("[{upstream}] failed to obtain access token: {source}")]
    Credential {
        upstream: String,
        #[source]
        source: ClientError,
    },

    /// Credential or event request exceeded the request timeout
    #[error("[{upstream}] {operation} timed out after {timeout_ms}ms")]
    Timeout {
        upstream: String,
        operation: &'static str,
        timeout_ms: u64,
    },

    /// Event listing failed
    #[error("[{upstream}] failed to list events in namespace '{namespace}': {source}")]
    Fetch {
        upstream: String,
        namespace: String,
        #[source]
        source: ClientError,
    },
}

/// Registration conflicts, fatal at startup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Another upstream already uses this name
    #[error("upstream '{0}' already exists")]
    DuplicateName(String),

    /// Another upstream already collects from this URI
    #[error("upstream '{existing}' already collects from '{uri}'")]
    DuplicateSource { existing: String, uri: String },
}
