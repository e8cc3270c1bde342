//! Error types for session orchestration.

use taskdb_store::StoreError;
use taskdb_sync::ReplicationError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while orchestrating a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The application configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation is not valid in the session's current lifecycle
    /// state.
    #[error("session state error: {0}")]
    SessionState(String),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A replication operation failed.
    #[error(transparent)]
    Replication(#[from] ReplicationError),
}

impl SessionError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a session state error.
    pub fn session_state(message: impl Into<String>) -> Self {
        Self::SessionState(message.into())
    }
}
