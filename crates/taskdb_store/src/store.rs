//! Document store facade.

use crate::backend::DocumentBackend;
use crate::change::{ChangeEvent, ChangeFeed, ChangeType};
use crate::error::{StoreError, StoreResult};
use crate::guard::{Access, OwnershipGuard};
use crate::index::OwnerIndex;
use crate::item::Item;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::sync::mpsc::Receiver;

/// Name of the task collection.
pub const TASKS_COLLECTION: &str = "tasks";
/// Name of the value index over the owner field.
pub const OWNER_INDEX: &str = "idx_tasks_owner_id";

/// A per-user document store for task items.
///
/// `DocumentStore` is the primary entry point of the storage layer. It
/// wraps a [`DocumentBackend`] with:
/// - Typed CRUD over [`Item`] documents
/// - Ownership enforcement on mutations
/// - A value index over the owner field
/// - A change feed emitting events after every committed write
///
/// # Opening a store
///
/// ```rust
/// use taskdb_store::{DocumentStore, InMemoryBackend, TASKS_COLLECTION, OWNER_INDEX};
///
/// let store = DocumentStore::open("tasks-alice", Box::new(InMemoryBackend::new())).unwrap();
/// store.ensure_collection(TASKS_COLLECTION).unwrap();
/// store.create_index(OWNER_INDEX).unwrap();
///
/// let item = store.add_task("buy milk", "alice").unwrap();
/// assert_eq!(store.get(&item.id).unwrap().unwrap().summary, "buy milk");
/// ```
///
/// # Consistency
///
/// Each save/delete is a single atomic per-document operation; there is no
/// cross-document transaction. Concurrent writers to the same document
/// resolve last-write-wins.
pub struct DocumentStore {
    /// Store (database) name, derived from the session user.
    name: String,
    /// Backend holding the persisted documents.
    backend: Box<dyn DocumentBackend>,
    /// Collections that have been created in this store.
    collections: RwLock<BTreeSet<String>>,
    /// Owner index, present once `create_index` has run.
    index: RwLock<Option<OwnerIndex>>,
    /// Feed of committed changes.
    feed: ChangeFeed,
    /// Serializes read-modify-write mutations against index bookkeeping.
    write_gate: Mutex<()>,
    /// Whether the store is open.
    is_open: RwLock<bool>,
}

impl DocumentStore {
    /// Opens (or creates) a store over the given backend.
    ///
    /// Opening is idempotent with respect to existing data: documents
    /// already present in the backend are kept as-is.
    pub fn open(name: impl Into<String>, backend: Box<dyn DocumentBackend>) -> StoreResult<Self> {
        Ok(Self {
            name: name.into(),
            backend,
            collections: RwLock::new(BTreeSet::new()),
            index: RwLock::new(None),
            feed: ChangeFeed::new(),
            write_gate: Mutex::new(()),
            is_open: RwLock::new(true),
        })
    }

    /// Returns the store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ensures a collection exists, creating it if missing.
    ///
    /// Calling this for an existing collection is a no-op that returns the
    /// same collection.
    pub fn ensure_collection(&self, name: &str) -> StoreResult<()> {
        self.ensure_open()?;
        self.collections.write().insert(name.to_string());
        Ok(())
    }

    /// Creates the value index over the owner field, rebuilding it from
    /// the documents currently in the backend.
    ///
    /// Create-or-get: if an index with the same name already exists it is
    /// kept, not rebuilt.
    pub fn create_index(&self, name: &str) -> StoreResult<()> {
        self.ensure_open()?;
        self.require_collection()?;

        let mut slot = self.index.write();
        if slot.as_ref().is_some_and(|idx| idx.name() == name) {
            return Ok(());
        }

        let mut index = OwnerIndex::new(name);
        index.rebuild(self.scan_decoded()?.into_iter().map(|item| (item.owner_id, item.id)));
        *slot = Some(index);
        Ok(())
    }

    /// Creates a new task item and saves it.
    ///
    /// The item gets a freshly generated id and starts incomplete. A
    /// serialization failure aborts the write; nothing is persisted.
    pub fn add_task(&self, summary: &str, owner_id: &str) -> StoreResult<Item> {
        self.ensure_open()?;
        self.require_collection()?;

        let item = Item::new(summary, owner_id);
        let payload = item.encode()?;

        let _gate = self.write_gate.lock();
        self.backend.put(&item.id, &payload)?;
        if let Some(index) = self.index.write().as_mut() {
            index.insert(item.owner_id.clone(), item.id.clone());
        }
        self.feed.emit(ChangeType::Insert, &item.id);

        Ok(item)
    }

    /// Gets an item by id.
    ///
    /// Returns `None` if no document with that id exists.
    pub fn get(&self, id: &str) -> StoreResult<Option<Item>> {
        self.ensure_open()?;
        match self.backend.get(id)? {
            Some(bytes) => Ok(Some(Item::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Updates an item's completion flag and summary.
    ///
    /// The stored document is looked up by `item.id`; the ownership check
    /// runs against the *stored* owner id, and `id`/`owner_id` are carried
    /// over unchanged.
    pub fn update(
        &self,
        item: &Item,
        is_complete: bool,
        summary: &str,
        session_user_id: &str,
    ) -> StoreResult<()> {
        self.ensure_open()?;
        self.require_collection()?;

        let _gate = self.write_gate.lock();

        let mut stored = match self.backend.get(&item.id)? {
            Some(bytes) => Item::decode(&bytes)?,
            None => return Err(StoreError::not_found(&item.id)),
        };

        if OwnershipGuard::check(&stored.owner_id, session_user_id) == Access::Denied {
            return Err(StoreError::ownership(&item.id));
        }

        stored.is_complete = is_complete;
        stored.summary = summary.to_string();
        let payload = stored.encode()?;

        self.backend.put(&stored.id, &payload)?;
        self.feed.emit(ChangeType::Update, &stored.id);
        Ok(())
    }

    /// Deletes an item.
    ///
    /// The stored document is looked up by `item.id`; the ownership check
    /// runs against the stored owner id.
    pub fn delete(&self, item: &Item, session_user_id: &str) -> StoreResult<()> {
        self.ensure_open()?;
        self.require_collection()?;

        let _gate = self.write_gate.lock();

        let stored = match self.backend.get(&item.id)? {
            Some(bytes) => Item::decode(&bytes)?,
            None => return Err(StoreError::not_found(&item.id)),
        };

        if OwnershipGuard::check(&stored.owner_id, session_user_id) == Access::Denied {
            return Err(StoreError::ownership(&item.id));
        }

        self.backend.delete(&stored.id)?;
        if let Some(index) = self.index.write().as_mut() {
            index.remove(&stored.owner_id, &stored.id);
        }
        self.feed.emit(ChangeType::Delete, &stored.id);
        Ok(())
    }

    /// Lists all items in the store.
    ///
    /// Ordering is backend-defined. A document that fails to decode is
    /// logged and skipped so one malformed document cannot blank the
    /// result set.
    pub fn list(&self) -> StoreResult<Vec<Item>> {
        self.ensure_open()?;
        self.scan_decoded()
    }

    /// Lists all items belonging to an owner, ascending by id.
    ///
    /// Uses the owner index when present, otherwise falls back to a full
    /// scan with a host-language filter.
    pub fn list_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Item>> {
        self.ensure_open()?;

        if let Some(index) = self.index.read().as_ref() {
            let mut items = Vec::new();
            for id in index.lookup(owner_id) {
                match self.backend.get(&id)? {
                    Some(bytes) => match Item::decode(&bytes) {
                        Ok(item) => items.push(item),
                        Err(e) => {
                            tracing::warn!(document_id = %id, error = %e, "skipping undecodable document");
                        }
                    },
                    // Index and backend can briefly disagree under
                    // concurrent delete; treat as already gone.
                    None => {}
                }
            }
            return Ok(items);
        }

        let mut items: Vec<Item> = self
            .scan_decoded()?
            .into_iter()
            .filter(|item| item.owner_id == owner_id)
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    /// Subscribes to the store's change feed.
    pub fn subscribe_changes(&self) -> Receiver<ChangeEvent> {
        self.feed.subscribe()
    }

    /// Closes the store, flushing pending writes.
    ///
    /// Closing twice is a no-op. Operations after close fail with
    /// [`StoreError::Closed`].
    pub fn close(&self) -> StoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }
        self.backend.flush()?;
        *is_open = false;
        Ok(())
    }

    /// Checks if the store is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }

    fn require_collection(&self) -> StoreResult<()> {
        if self.collections.read().contains(TASKS_COLLECTION) {
            Ok(())
        } else {
            Err(StoreError::collection_not_found(TASKS_COLLECTION))
        }
    }

    fn scan_decoded(&self) -> StoreResult<Vec<Item>> {
        let mut items = Vec::new();
        for (id, bytes) in self.backend.list()? {
            match Item::decode(&bytes) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!(document_id = %id, error = %e, "skipping undecodable document");
                }
            }
        }
        Ok(items)
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("name", &self.name)
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;

    fn create_store() -> DocumentStore {
        let store =
            DocumentStore::open("tasks-test", Box::new(InMemoryBackend::new())).unwrap();
        store.ensure_collection(TASKS_COLLECTION).unwrap();
        store.create_index(OWNER_INDEX).unwrap();
        store
    }

    #[test]
    fn add_then_get() {
        let store = create_store();
        let item = store.add_task("buy milk", "u1").unwrap();

        let found = store.get(&item.id).unwrap().unwrap();
        assert!(!found.is_complete);
        assert_eq!(found.summary, "buy milk");
        assert_eq!(found.owner_id, "u1");
    }

    #[test]
    fn get_missing_returns_none() {
        let store = create_store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn mutation_before_collection_setup_fails() {
        let store =
            DocumentStore::open("tasks-test", Box::new(InMemoryBackend::new())).unwrap();
        let result = store.add_task("x", "u1");
        assert!(matches!(result, Err(StoreError::CollectionNotFound { .. })));
    }

    #[test]
    fn update_by_owner_roundtrips() {
        let store = create_store();
        let item = store.add_task("buy milk", "u1").unwrap();

        store.update(&item, true, "x", "u1").unwrap();

        let stored = store.get(&item.id).unwrap().unwrap();
        assert!(stored.is_complete);
        assert_eq!(stored.summary, "x");
        // id and owner are immutable across update
        assert_eq!(stored.id, item.id);
        assert_eq!(stored.owner_id, "u1");
    }

    #[test]
    fn update_by_non_owner_is_denied_and_document_unchanged() {
        let store = create_store();
        let item = store.add_task("buy milk", "u1").unwrap();

        let result = store.update(&item, true, "hijacked", "u2");
        assert!(matches!(result, Err(StoreError::Ownership { .. })));

        let stored = store.get(&item.id).unwrap().unwrap();
        assert!(!stored.is_complete);
        assert_eq!(stored.summary, "buy milk");
    }

    #[test]
    fn update_missing_document_is_not_found() {
        let store = create_store();
        let ghost = Item::new("ghost", "u1");
        let result = store.update(&ghost, true, "x", "u1");
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn delete_by_owner() {
        let store = create_store();
        let item = store.add_task("buy milk", "u1").unwrap();

        store.delete(&item, "u1").unwrap();
        assert!(store.get(&item.id).unwrap().is_none());
        assert!(store.list_for_owner("u1").unwrap().is_empty());
    }

    #[test]
    fn delete_by_non_owner_is_denied_and_document_survives() {
        let store = create_store();
        let item = store.add_task("buy milk", "u1").unwrap();

        let result = store.delete(&item, "u2");
        assert!(matches!(result, Err(StoreError::Ownership { .. })));
        assert!(store.get(&item.id).unwrap().is_some());
    }

    #[test]
    fn delete_missing_document_is_not_found() {
        let store = create_store();
        let ghost = Item::new("ghost", "u1");
        let result = store.delete(&ghost, "u1");
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn list_for_owner_is_scoped_and_id_ordered() {
        let store = create_store();
        store.add_task("a", "u1").unwrap();
        store.add_task("b", "u1").unwrap();
        store.add_task("c", "u2").unwrap();

        let mine = store.list_for_owner("u1").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|i| i.owner_id == "u1"));
        assert!(mine.windows(2).all(|w| w[0].id < w[1].id));

        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[test]
    fn list_skips_undecodable_documents() {
        let backend = InMemoryBackend::new();
        backend.put("bad", b"{not json").unwrap();
        let store = DocumentStore::open("tasks-test", Box::new(backend)).unwrap();
        store.ensure_collection(TASKS_COLLECTION).unwrap();
        store.create_index(OWNER_INDEX).unwrap();

        store.add_task("good", "u1").unwrap();

        let items = store.list().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].summary, "good");
    }

    #[test]
    fn index_rebuild_covers_existing_documents() {
        let backend = InMemoryBackend::new();
        let seeded = Item::new("pre-existing", "u1");
        backend.put(&seeded.id, &seeded.encode().unwrap()).unwrap();

        let store = DocumentStore::open("tasks-test", Box::new(backend)).unwrap();
        store.ensure_collection(TASKS_COLLECTION).unwrap();
        store.create_index(OWNER_INDEX).unwrap();

        let mine = store.list_for_owner("u1").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].summary, "pre-existing");
    }

    #[test]
    fn create_index_is_idempotent() {
        let store = create_store();
        store.add_task("a", "u1").unwrap();
        store.create_index(OWNER_INDEX).unwrap();
        assert_eq!(store.list_for_owner("u1").unwrap().len(), 1);
    }

    #[test]
    fn change_feed_emits_after_commit() {
        let store = create_store();
        let rx = store.subscribe_changes();

        let item = store.add_task("a", "u1").unwrap();
        store.update(&item, true, "a", "u1").unwrap();
        store.delete(&item, "u1").unwrap();

        assert_eq!(rx.recv().unwrap().change_type, ChangeType::Insert);
        assert_eq!(rx.recv().unwrap().change_type, ChangeType::Update);
        assert_eq!(rx.recv().unwrap().change_type, ChangeType::Delete);
    }

    #[test]
    fn denied_mutation_emits_no_change() {
        let store = create_store();
        let item = store.add_task("a", "u1").unwrap();
        let rx = store.subscribe_changes();

        let _ = store.update(&item, true, "x", "u2");
        let _ = store.delete(&item, "u2");

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn close_store() {
        let store = create_store();
        assert!(store.is_open());

        store.close().unwrap();
        assert!(!store.is_open());

        // idempotent
        store.close().unwrap();

        let result = store.get("any");
        assert!(matches!(result, Err(StoreError::Closed)));
        let result = store.add_task("x", "u1");
        assert!(matches!(result, Err(StoreError::Closed)));
    }
}
