//! Configuration for the replication coordinator.

use std::fmt;

/// Basic-auth credentials used to authenticate against the endpoint.
///
/// Built from the session user at session initialization. The password is
/// redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Username presented to the endpoint.
    pub username: String,
    password: String,
}

impl BasicCredentials {
    /// Creates credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Direction of replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicatorType {
    /// Bidirectional sync (the default for sessions).
    PushAndPull,
    /// Local changes only.
    Push,
    /// Remote changes only.
    Pull,
}

/// Configuration for a replication session.
///
/// Built once at session initialization from the validated endpoint URL
/// and the session user, then reused verbatim across pause/resume cycles
/// so repeated cycles never repeat validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatorConfig {
    /// Validated endpoint URL.
    pub endpoint_url: String,
    /// Name of the collection scoped for sync.
    pub collection: String,
    /// Basic-auth credentials from the session user.
    pub credentials: BasicCredentials,
    /// Replication direction.
    pub replicator_type: ReplicatorType,
    /// Whether the replicator keeps running and reacting to changes.
    pub continuous: bool,
}

impl ReplicatorConfig {
    /// Creates a continuous, bidirectional configuration.
    pub fn new(
        endpoint_url: impl Into<String>,
        collection: impl Into<String>,
        credentials: BasicCredentials,
    ) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            collection: collection.into(),
            credentials,
            replicator_type: ReplicatorType::PushAndPull,
            continuous: true,
        }
    }

    /// Sets the replication direction.
    #[must_use]
    pub fn with_replicator_type(mut self, replicator_type: ReplicatorType) -> Self {
        self.replicator_type = replicator_type;
        self
    }

    /// Sets whether replication is continuous.
    #[must_use]
    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }
}
