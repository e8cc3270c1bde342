//! Transport layer abstraction for replication.

use crate::config::ReplicatorConfig;
use crate::error::{ReplicationError, ReplicationResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// Activity level reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Transport is establishing a connection.
    Connecting,
    /// Connected and waiting for changes.
    Idle,
    /// Actively transferring changes.
    Busy,
    /// Connection lost; the transport handles its own reconnection.
    Offline,
    /// Transport has stopped.
    Stopped,
}

/// A status transition observed from the transport.
///
/// Carries either a new activity level or an error description. Errors
/// are observability only: all reconnect and backoff behavior lives
/// inside the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportStatus {
    /// Current activity level.
    pub activity: Activity,
    /// Error observed at this transition, if any.
    pub error: Option<String>,
}

impl TransportStatus {
    /// Creates an activity-only status.
    pub fn activity(activity: Activity) -> Self {
        Self {
            activity,
            error: None,
        }
    }

    /// Creates an error status.
    pub fn error(activity: Activity, message: impl Into<String>) -> Self {
        Self {
            activity,
            error: Some(message.into()),
        }
    }
}

/// The wire-level replication transport.
///
/// This trait abstracts the sync protocol implementation, allowing
/// different transports (WebSocket, HTTP long-poll, mock for testing).
/// The transport owns retry and backoff entirely; the coordinator only
/// observes status transitions.
pub trait ReplicationTransport: Send + Sync {
    /// Establishes the replication session described by `config`.
    fn connect(&self, config: &ReplicatorConfig) -> ReplicationResult<()>;

    /// Tears the replication session down.
    fn disconnect(&self) -> ReplicationResult<()>;

    /// Subscribes to status transitions.
    ///
    /// Returns a receiver observing all future transitions.
    fn status_events(&self) -> Receiver<TransportStatus>;

    /// Checks if the transport currently holds a session.
    fn is_connected(&self) -> bool;
}

/// A mock transport for testing.
#[derive(Default)]
pub struct MockTransport {
    connected: AtomicBool,
    connect_count: AtomicU64,
    fail_connect: RwLock<Option<String>>,
    subscribers: RwLock<Vec<Sender<TransportStatus>>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `connect` calls fail with the given message.
    pub fn fail_next_connect(&self, message: impl Into<String>) {
        *self.fail_connect.write() = Some(message.into());
    }

    /// Emits a status transition to all subscribers.
    pub fn emit_status(&self, status: TransportStatus) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(status.clone()).is_ok());
    }

    /// Returns how many times `connect` has been called.
    pub fn connect_count(&self) -> u64 {
        self.connect_count.load(Ordering::SeqCst)
    }
}

impl ReplicationTransport for MockTransport {
    fn connect(&self, _config: &ReplicatorConfig) -> ReplicationResult<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_connect.write().take() {
            return Err(ReplicationError::transport(message));
        }
        self.connected.store(true, Ordering::SeqCst);
        self.emit_status(TransportStatus::activity(Activity::Idle));
        Ok(())
    }

    fn disconnect(&self) -> ReplicationResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.emit_status(TransportStatus::activity(Activity::Stopped));
        Ok(())
    }

    fn status_events(&self) -> Receiver<TransportStatus> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
