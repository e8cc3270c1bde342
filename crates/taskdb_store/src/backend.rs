//! Document backend trait definition.

use crate::error::StoreResult;

/// A low-level per-document byte store.
///
/// Backends are **opaque byte stores** keyed by document id. They provide
/// atomic single-document operations; the store owns all payload
/// interpretation, so backends do not understand items, indexes, or
/// collections.
///
/// # Invariants
///
/// - `put` replaces the whole document atomically
/// - `get` returns exactly the bytes previously written for that id
/// - `flush` ensures all prior writes are durable
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing and ephemeral stores
/// - [`super::FileBackend`] - For persistent storage
pub trait DocumentBackend: Send + Sync {
    /// Writes (or replaces) the document with the given id.
    ///
    /// The write is atomic: a failure leaves any previous version intact.
    fn put(&self, id: &str, payload: &[u8]) -> StoreResult<()>;

    /// Reads the document with the given id.
    ///
    /// Returns `None` if no document with that id exists.
    fn get(&self, id: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Removes the document with the given id.
    ///
    /// Returns `true` if a document was removed, `false` if none existed.
    fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Lists all documents as `(id, payload)` pairs.
    ///
    /// Ordering is backend-defined.
    fn list(&self) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Flushes all pending writes to durable storage.
    fn flush(&self) -> StoreResult<()>;
}
