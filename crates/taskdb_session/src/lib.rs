//! # taskdb Session
//!
//! Session orchestration for the taskdb data layer.
//!
//! This crate ties the per-user document store, live queries, and
//! replication coordination together behind one [`SessionManager`]:
//! - [`SessionManager::initialize_session`] derives the per-user database
//!   name, opens the store, builds the owner index and standing queries,
//!   validates the endpoint, and starts background sync
//! - document mutations pass through the store's ownership check bound to
//!   the session user
//! - [`SessionManager::close_session`] tears everything down best-effort,
//!   listeners first, and reports (never raises) failures
//!
//! Credential verification is delegated to an [`AuthenticationGateway`];
//! a fixed-table [`StaticGateway`] is provided for tests and local use.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod error;
mod sanitize;
mod session;

pub use auth::{AuthError, AuthenticatedUser, AuthenticationGateway, StaticGateway};
pub use config::AppConfig;
pub use error::{SessionError, SessionResult};
pub use sanitize::{database_name, sanitize_username, DATABASE_PREFIX};
pub use session::{BackendFactory, CloseReport, LifecycleState, SessionManager};
