//! Live query engine: standing queries with change delivery.

use crate::query::CachedQuery;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use taskdb_store::{DocumentStore, Item, StoreError, StoreResult};

/// How long the worker waits on the change feed before re-checking its
/// stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handle identifying an active live-query subscription.
///
/// Returned from [`LiveQueryEngine::subscribe`]; pass it back to
/// [`LiveQueryEngine::unsubscribe`] to tear the listener down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
}

/// Worker-side state for one subscription.
struct ActiveSubscription {
    id: u64,
    stop: Arc<AtomicBool>,
    /// Lock ordering deliveries against teardown: the worker delivers
    /// only while holding this and seeing `stop == false`; `unsubscribe`
    /// flips `stop` while holding it.
    delivery: Arc<Mutex<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ActiveSubscription {
    /// Stops the worker and waits for it to exit.
    ///
    /// After this returns, no further result delivery will be attempted.
    fn teardown(mut self) {
        {
            let _gate = self.delivery.lock();
            self.stop.store(true, Ordering::SeqCst);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Standing queries with change notification over one document store.
///
/// At most one subscription is active at a time; subscribing again tears
/// down the previous listener first. Each change batch from the store
/// triggers exactly one delivery of the full materialized result list,
/// through the receiver returned from [`subscribe`](Self::subscribe).
///
/// Delivery is asynchronous relative to the triggering write: a write
/// followed immediately by a read of the live result list is not
/// guaranteed to observe the write until change propagation completes.
pub struct LiveQueryEngine {
    store: Arc<DocumentStore>,
    active: Mutex<Option<ActiveSubscription>>,
    next_id: AtomicU64,
}

impl LiveQueryEngine {
    /// Creates an engine over the given store.
    ///
    /// The engine holds the store only for its query capability; the
    /// session layer remains the store's owner.
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            store,
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribes to a cached query.
    ///
    /// Any previously active subscription is torn down first. The initial
    /// materialized result list is delivered immediately; afterwards one
    /// list is delivered per change batch. Rows that fail to decode are
    /// logged and skipped by the store, never aborting a delivery.
    pub fn subscribe(
        &self,
        query: CachedQuery,
    ) -> StoreResult<(Subscription, Receiver<Vec<Item>>)> {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.teardown();
        }

        // Subscribe to changes before the initial materialization so no
        // write between snapshot and worker start is lost.
        let changes = self.store.subscribe_changes();
        let (tx, rx) = mpsc::channel::<Vec<Item>>();

        // The receiver is still in hand, so this send cannot fail
        let _ = tx.send(query.run(&self.store)?);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stop = Arc::new(AtomicBool::new(false));
        let delivery = Arc::new(Mutex::new(()));

        let worker = {
            let store = Arc::clone(&self.store);
            let stop = Arc::clone(&stop);
            let delivery = Arc::clone(&delivery);
            std::thread::spawn(move || {
                run_worker(&store, &query, &changes, &stop, &delivery, &tx);
            })
        };

        *active = Some(ActiveSubscription {
            id,
            stop,
            delivery,
            worker: Some(worker),
        });

        Ok((Subscription { id }, rx))
    }

    /// Removes a subscription's listener.
    ///
    /// After this returns, no further delivery is attempted for the
    /// handle. Unsubscribing a handle that is no longer active (because a
    /// later `subscribe` replaced it) is a no-op.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|sub| sub.id == subscription.id) {
            if let Some(sub) = active.take() {
                sub.teardown();
            }
        }
    }

    /// Tears down whatever subscription is active, if any.
    ///
    /// Used by session close, where no handle is at hand.
    pub fn unsubscribe_current(&self) {
        if let Some(sub) = self.active.lock().take() {
            sub.teardown();
        }
    }

    /// Returns `true` if a subscription is currently active.
    pub fn has_subscription(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl Drop for LiveQueryEngine {
    fn drop(&mut self) {
        self.unsubscribe_current();
    }
}

/// Worker loop: one delivery of the full result list per change batch.
fn run_worker(
    store: &DocumentStore,
    query: &CachedQuery,
    changes: &Receiver<taskdb_store::ChangeEvent>,
    stop: &AtomicBool,
    delivery: &Mutex<()>,
    tx: &Sender<Vec<Item>>,
) {
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }

        match changes.recv_timeout(POLL_INTERVAL) {
            Ok(_event) => {
                // Coalesce whatever else is already queued into this batch
                while changes.try_recv().is_ok() {}

                let items = match query.run(store) {
                    Ok(items) => items,
                    Err(StoreError::Closed) => return,
                    Err(e) => {
                        tracing::warn!(error = %e, "live query recomputation failed");
                        continue;
                    }
                };

                let _gate = delivery.lock();
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                if tx.send(items).is_err() {
                    // Consumer dropped the receiver
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
