//! Application configuration.

use crate::error::{SessionError, SessionResult};
use url::Url;

/// Schemes accepted for the sync endpoint.
const ALLOWED_SCHEMES: &[&str] = &["ws", "wss", "http", "https"];

/// Configuration consumed once at session initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Sync endpoint URL, e.g. `wss://sync.example.com/tasks`.
    pub endpoint_url: String,
}

impl AppConfig {
    /// Creates a configuration with the given endpoint URL.
    ///
    /// The URL is not validated here; validation happens at session
    /// initialization so a bad value surfaces as a session-level error.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
        }
    }

    /// Validates the endpoint URL.
    ///
    /// The URL must parse, carry one of the `ws`/`wss`/`http`/`https`
    /// schemes, and name a host.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` describing the defect.
    pub fn validate_endpoint(&self) -> SessionResult<()> {
        let url = Url::parse(&self.endpoint_url).map_err(|e| {
            SessionError::configuration(format!(
                "invalid endpoint URL {:?}: {e}",
                self.endpoint_url
            ))
        })?;

        if !ALLOWED_SCHEMES.contains(&url.scheme()) {
            return Err(SessionError::configuration(format!(
                "unsupported endpoint scheme {:?}",
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            return Err(SessionError::configuration(format!(
                "endpoint URL {:?} has no host",
                self.endpoint_url
            )));
        }

        Ok(())
    }
}
