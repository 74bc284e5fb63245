//! Configuration for the publisher module.

use serde::{Deserialize, Serialize};

/// Credential bundle for the remote object-storage backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Bearer token for the current session.
    pub session_token: String,
    /// Application identifier registered with the backend.
    pub app_id: String,
    /// Backend session identifier.
    pub session_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("session_token", &"[REDACTED]")
            .field("app_id", &self.app_id)
            .field("session_id", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for publishing finished artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Base URL of the storage backend.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Scheme of the constructed fallback reference (`<scheme>://<file_id>`).
    #[serde(default = "default_reference_scheme")]
    pub reference_scheme: String,

    /// Scheme used for placeholder references when no credentials are set.
    #[serde(default = "default_placeholder_scheme")]
    pub placeholder_scheme: String,

    /// Request timeout in seconds. Uploads of large files need a generous value.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Backend credentials. Absent means offline mode.
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

fn default_endpoint() -> String {
    "http://localhost:8090".to_string()
}

fn default_reference_scheme() -> String {
    "remote".to_string()
}

fn default_placeholder_scheme() -> String {
    "mock".to_string()
}

fn default_timeout() -> u64 {
    3600
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            reference_scheme: default_reference_scheme(),
            placeholder_scheme: default_placeholder_scheme(),
            timeout_secs: default_timeout(),
            credentials: None,
        }
    }
}

impl PublisherConfig {
    /// Sets the backend endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the credential bundle.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Endpoint without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}
