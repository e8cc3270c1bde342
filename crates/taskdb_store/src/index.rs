//! Value index over the owner field.

use std::collections::{BTreeSet, HashMap};

/// A value index mapping owner ids to document ids.
///
/// `OwnerIndex` backs the owner-scoped query with O(1) owner lookup
/// instead of a full scan. Ids per owner are kept in a `BTreeSet`, so
/// lookups yield ids in ascending order, which is the ordering contract
/// of the my-items query.
///
/// The index is not self-locking; [`super::DocumentStore`] guards it with
/// its own lock and keeps it consistent with every committed write.
#[derive(Debug)]
pub struct OwnerIndex {
    /// Index name (internal, used for create-or-get semantics).
    name: String,
    /// Owner id to document ids.
    entries: HashMap<String, BTreeSet<String>>,
    /// Total entry count.
    count: usize,
}

impl OwnerIndex {
    /// Creates a new empty index with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            count: 0,
        }
    }

    /// Returns the index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rebuilds the index from `(owner_id, document_id)` pairs.
    pub fn rebuild<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.clear();
        for (owner, id) in pairs {
            self.insert(owner, id);
        }
    }

    /// Inserts a document id under an owner.
    pub fn insert(&mut self, owner_id: String, document_id: String) {
        let set = self.entries.entry(owner_id).or_default();
        if set.insert(document_id) {
            self.count += 1;
        }
    }

    /// Removes a document id from an owner's entry.
    ///
    /// Returns `true` if the entry existed.
    pub fn remove(&mut self, owner_id: &str, document_id: &str) -> bool {
        if let Some(set) = self.entries.get_mut(owner_id) {
            if set.remove(document_id) {
                self.count -= 1;
                if set.is_empty() {
                    self.entries.remove(owner_id);
                }
                return true;
            }
        }
        false
    }

    /// Returns all document ids for an owner, in ascending id order.
    pub fn lookup(&self, owner_id: &str) -> Vec<String> {
        match self.entries.get(owner_id) {
            Some(set) => set.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Returns the number of indexed entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Clears all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }
}
