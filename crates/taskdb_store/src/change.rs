//! Change feed for observing committed writes.
//!
//! The change feed emits an event after every committed document write,
//! driving live-query recomputation and giving the sync layer a hook into
//! local changes. Events are delivered to each subscriber over its own
//! mpsc channel; disconnected subscribers are pruned on the next emit.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// Type of change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// Document was inserted (no previous version existed).
    Insert,
    /// Document was updated (previous version existed).
    Update,
    /// Document was deleted.
    Delete,
}

/// A single change event from the change feed.
///
/// Events are emitted only after the backing write has committed; they
/// carry the document id, not the payload; consumers re-query the store
/// for the current materialized state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Sequence number of the commit, monotonically increasing per store.
    pub sequence: u64,
    /// Id of the affected document.
    pub document_id: String,
    /// Type of change.
    pub change_type: ChangeType,
}

/// A change feed that distributes committed writes to subscribers.
///
/// The feed:
/// - Emits only committed writes
/// - Preserves commit order per subscriber
/// - Supports multiple subscribers
/// - Is thread-safe
#[derive(Debug, Default)]
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Sender<ChangeEvent>>>,
    next_sequence: AtomicU64,
}

impl ChangeFeed {
    /// Creates a new change feed.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Subscribes to the change feed.
    ///
    /// Returns a receiver that will observe all future change events.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits a change event to all subscribers.
    ///
    /// Called by the store after a write commits. Subscribers whose
    /// receiver has been dropped are removed.
    pub fn emit(&self, change_type: ChangeType, document_id: &str) {
        let event = ChangeEvent {
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
            document_id: document_id.to_string(),
            change_type,
        };

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
