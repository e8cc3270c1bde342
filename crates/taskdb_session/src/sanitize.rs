//! Storage identifier derivation.

/// Prefix for per-user database names.
pub const DATABASE_PREFIX: &str = "tasks-";

/// Derives a storage-safe identifier from a username.
///
/// Every character outside `[A-Za-z0-9_-]` is replaced with `-`, so
/// usernames like `alice@example.com` become `alice-example-com`. The
/// derivation is pure and idempotent: sanitizing an already-sanitized
/// name returns it unchanged.
pub fn sanitize_username(username: &str) -> String {
    username
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Derives the per-user database name from a username.
pub fn database_name(username: &str) -> String {
    format!("{DATABASE_PREFIX}{}", sanitize_username(username))
}
