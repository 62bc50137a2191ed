//! Cache error types

/// Error type produced by caller-supplied fetch operations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cache-related errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No live entry for the key: it never existed, was deleted, or expired.
    /// This is the normal miss signal the broker acts on.
    #[error("cache data not found")]
    NotFound,

    /// An entry exists but its payload is not of the expected type. Two
    /// typed views with the same key but different value types collide;
    /// the broker treats this like a miss and overwrites on refetch.
    #[error("cache data type mismatch")]
    TypeMismatch,

    /// The caller-supplied fetch operation failed. Nothing was stored.
    #[error("fetch error: {0}")]
    Fetch(#[source] BoxError),
}
