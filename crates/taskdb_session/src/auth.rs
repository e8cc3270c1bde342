//! Authentication collaborator surface.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors returned by an [`AuthenticationGateway`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// The username/password pair was rejected.
    #[error("invalid credentials for {username}")]
    InvalidCredentials {
        /// Username the login was attempted with.
        username: String,
    },

    /// The identity provider could not be reached.
    #[error("authentication gateway unavailable: {0}")]
    Unavailable(String),
}

/// A user accepted by the identity provider.
///
/// The session consumes only the username (which doubles as the user id)
/// and the password, the latter solely to build the replication
/// authenticator.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    username: String,
    password: String,
}

impl AuthenticatedUser {
    /// Creates an authenticated user record.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the user id documents are owned under.
    pub fn user_id(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Verifies credentials against an identity provider.
pub trait AuthenticationGateway: Send + Sync {
    /// Attempts to log in with the given credentials.
    fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// A gateway backed by a fixed user table.
///
/// Suitable for tests and local single-user setups.
#[derive(Debug, Default)]
pub struct StaticGateway {
    users: HashMap<String, String>,
}

impl StaticGateway {
    /// Creates an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a username/password pair.
    pub fn register(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.users.insert(username.into(), password.into());
    }
}

impl AuthenticationGateway for StaticGateway {
    fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        match self.users.get(username) {
            Some(stored) if stored == password => {
                Ok(AuthenticatedUser::new(username, password))
            }
            _ => Err(AuthError::InvalidCredentials {
                username: username.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_accepts_registered_credentials() {
        let mut gateway = StaticGateway::new();
        gateway.register("alice", "secret");

        let user = gateway.login("alice", "secret").unwrap();
        assert_eq!(user.username(), "alice");
        assert_eq!(user.user_id(), "alice");
        assert_eq!(user.password(), "secret");
    }

    #[test]
    fn login_rejects_wrong_password() {
        let mut gateway = StaticGateway::new();
        gateway.register("alice", "secret");

        let err = gateway.login("alice", "wrong").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials { .. }));
    }

    #[test]
    fn login_rejects_unknown_user() {
        let gateway = StaticGateway::new();
        assert!(gateway.login("nobody", "x").is_err());
    }

    #[test]
    fn debug_output_redacts_password() {
        let user = AuthenticatedUser::new("alice", "secret");
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("alice"));
    }
}
