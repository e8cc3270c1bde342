//! Cached queries over the document store.

use taskdb_store::{DocumentStore, Item, StoreResult};

/// Which slice of the task list a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    /// Every item in the store, regardless of owner.
    All,
    /// Only items owned by the session user.
    Mine,
}

/// A standing query compiled once per session.
///
/// There is no SQL or DSL layer: a cached query is the scope plus, for
/// [`QueryScope::Mine`], the owner id it was bound to at compile time.
/// Re-binding to a different user requires compiling a new query.
///
/// # Ordering
///
/// - `Mine` results are ascending by item id.
/// - `All` results follow store order, unspecified beyond that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedQuery {
    scope: QueryScope,
    owner_id: Option<String>,
}

impl CachedQuery {
    /// Compiles the all-items query.
    ///
    /// Deliberately exposes other users' items read-only; mutation is
    /// still gated by the ownership check.
    pub fn all_items() -> Self {
        Self {
            scope: QueryScope::All,
            owner_id: None,
        }
    }

    /// Compiles the my-items query, bound to the given owner id.
    pub fn my_items(owner_id: impl Into<String>) -> Self {
        Self {
            scope: QueryScope::Mine,
            owner_id: Some(owner_id.into()),
        }
    }

    /// Returns the query's scope.
    pub fn scope(&self) -> QueryScope {
        self.scope
    }

    /// Returns the owner id a `Mine` query was bound to.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Runs the query, materializing the full ordered result list.
    pub fn run(&self, store: &DocumentStore) -> StoreResult<Vec<Item>> {
        match (&self.scope, &self.owner_id) {
            (QueryScope::Mine, Some(owner)) => store.list_for_owner(owner),
            _ => store.list(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdb_store::{InMemoryBackend, OWNER_INDEX, TASKS_COLLECTION};

    fn create_store() -> DocumentStore {
        let store =
            DocumentStore::open("tasks-test", Box::new(InMemoryBackend::new())).unwrap();
        store.ensure_collection(TASKS_COLLECTION).unwrap();
        store.create_index(OWNER_INDEX).unwrap();
        store
    }

    #[test]
    fn all_items_spans_owners() {
        let store = create_store();
        store.add_task("a", "u1").unwrap();
        store.add_task("b", "u2").unwrap();

        let results = CachedQuery::all_items().run(&store).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn my_items_is_bound_at_compile_time() {
        let store = create_store();
        store.add_task("mine", "u1").unwrap();
        store.add_task("theirs", "u2").unwrap();

        let query = CachedQuery::my_items("u1");
        let results = query.run(&store).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].owner_id, "u1");
        assert_eq!(query.owner_id(), Some("u1"));
    }

    #[test]
    fn my_items_is_id_ordered() {
        let store = create_store();
        for i in 0..5 {
            store.add_task(&format!("t{i}"), "u1").unwrap();
        }

        let results = CachedQuery::my_items("u1").run(&store).unwrap();
        assert!(results.windows(2).all(|w| w[0].id < w[1].id));
    }
}
