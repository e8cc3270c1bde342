//! Error types for the document store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding or decoding a document failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document not found.
    #[error("document not found: {id}")]
    NotFound {
        /// The document id that was looked up.
        id: String,
    },

    /// Mutation attempted by a user who does not own the document.
    #[error("document {id} does not belong to the acting user")]
    Ownership {
        /// The document id the mutation targeted.
        id: String,
    },

    /// Collection has not been created in this store.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Name of the collection.
        name: String,
    },

    /// Another process holds the store's exclusive lock.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Creates a not-found error for a document id.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates an ownership violation error for a document id.
    pub fn ownership(id: impl Into<String>) -> Self {
        Self::Ownership { id: id.into() }
    }

    /// Creates a collection-not-found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }
}
