//! The task item document model.

use crate::error::StoreResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single task item.
///
/// Items are persisted as JSON objects with camelCase keys:
///
/// ```json
/// {"id": "…", "isComplete": false, "summary": "buy milk", "ownerId": "u1"}
/// ```
///
/// # Invariants
///
/// - `id` is generated at creation and never changes.
/// - `owner_id` is set at creation and never reassigned by this layer.
/// - Decoding tolerates a missing `isComplete` key (older documents did
///   not write it); it defaults to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Stable document identifier (lowercase UUID string).
    pub id: String,
    /// Whether the task has been completed.
    #[serde(default)]
    pub is_complete: bool,
    /// Short description of the task.
    pub summary: String,
    /// User id of the task's owner.
    pub owner_id: String,
}

impl Item {
    /// Creates a new incomplete item with a freshly generated id.
    pub fn new(summary: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: new_item_id(),
            is_complete: false,
            summary: summary.into(),
            owner_id: owner_id.into(),
        }
    }

    /// Encodes the item to its canonical persisted representation.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes an item from persisted bytes.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Generates a new unique item id.
///
/// Ids are version-4 UUIDs in lowercase hyphenated form, matching the id
/// format produced by other clients syncing against the same endpoint.
pub fn new_item_id() -> String {
    Uuid::new_v4().to_string()
}
