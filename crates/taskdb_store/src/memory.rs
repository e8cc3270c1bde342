//! In-memory document backend for testing.

use crate::backend::DocumentBackend;
use crate::error::StoreResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory document backend.
///
/// This backend stores all documents in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sessions that don't need persistence
///
/// Documents are kept in a `BTreeMap`, so `list` yields documents in
/// ascending id order.
///
/// # Example
///
/// ```rust
/// use taskdb_store::{DocumentBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.put("a", b"payload").unwrap();
/// assert_eq!(backend.get("a").unwrap(), Some(b"payload".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    documents: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns `true` if the backend holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Clears all documents from the backend.
    pub fn clear(&self) {
        self.documents.write().clear();
    }
}

impl DocumentBackend for InMemoryBackend {
    fn put(&self, id: &str, payload: &[u8]) -> StoreResult<()> {
        self.documents
            .write()
            .insert(id.to_string(), payload.to_vec());
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.documents.read().get(id).cloned())
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.documents.write().remove(id).is_some())
    }

    fn list(&self) -> StoreResult<Vec<(String, Vec<u8>)>> {
        Ok(self
            .documents
            .read()
            .iter()
            .map(|(id, payload)| (id.clone(), payload.clone()))
            .collect())
    }

    fn flush(&self) -> StoreResult<()> {
        // Nothing pending for an in-memory backend
        Ok(())
    }
}
