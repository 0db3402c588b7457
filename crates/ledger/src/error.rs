/// All errors that can be returned by a [`Ledger`](crate::Ledger) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency control conflict: a key read inside the
    /// snapshot was changed by another snapshot that committed first.
    #[error("concurrent conflict on key '{key}'")]
    ConcurrentConflict { key: String },

    /// A range scan was requested with `start > end`.
    #[error("invalid range: start '{start}' is after end '{end}'")]
    InvalidRange { start: String, end: String },

    /// The ledger could not be loaded from or written to durable storage.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A backend-specific storage error.
    #[error("storage backend error: {0}")]
    Backend(String),
}
