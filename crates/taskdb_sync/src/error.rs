//! Error types for replication coordination.

use thiserror::Error;

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors that can occur while coordinating replication.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// The replication configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transport reported a failure.
    #[error("transport error: {message}")]
    Transport {
        /// Error message from the transport.
        message: String,
    },
}

impl ReplicationError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ReplicationError::configuration("bad endpoint");
        assert_eq!(err.to_string(), "configuration error: bad endpoint");

        let err = ReplicationError::transport("connection refused");
        assert!(err.to_string().contains("connection refused"));
    }
}
