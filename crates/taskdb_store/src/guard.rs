//! Ownership check guarding document mutations.

/// Outcome of an ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The acting user owns the document.
    Authorized,
    /// The acting user does not own the document.
    Denied,
}

/// Authorization predicate restricting mutations to a document's owner.
///
/// The guard compares the *stored* owner id against the acting session
/// user, never a caller-supplied owner. Reads are never gated by this
/// guard: the all-items query deliberately exposes other users' items
/// read-only, and the my-items query is scoped by its filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipGuard;

impl OwnershipGuard {
    /// Checks whether `session_user_id` may mutate a document owned by
    /// `stored_owner_id`.
    pub fn check(stored_owner_id: &str, session_user_id: &str) -> Access {
        if stored_owner_id == session_user_id {
            Access::Authorized
        } else {
            Access::Denied
        }
    }
}
