//! # taskdb Sync
//!
//! Replication coordination for the taskdb data layer.
//!
//! This crate provides:
//! - [`ReplicationCoordinator`] - the explicit state machine driving the
//!   background sync session
//! - [`ReplicationTransport`] - the pluggable wire protocol seam, with a
//!   [`MockTransport`] for tests
//! - [`ReplicatorConfig`] - endpoint, collection, and credential bundle
//!   built once per session and reused across pause/resume cycles
//!
//! The coordinator never retries or reconnects on its own; those
//! behaviors belong to the transport, and the coordinator only observes
//! and records the transport's status transitions. Credentials are
//! carried in [`BasicCredentials`], which never exposes the password
//! through `Debug` output.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod transport;

pub use config::{BasicCredentials, ReplicatorConfig, ReplicatorType};
pub use coordinator::{ReplicationCoordinator, ReplicationState, ReplicationStatus};
pub use error::{ReplicationError, ReplicationResult};
pub use transport::{Activity, MockTransport, ReplicationTransport, TransportStatus};
