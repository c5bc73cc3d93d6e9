use std::io;

/// Errors from metrics store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected the request due to rate limiting.
    #[error("request throttled: {0}")]
    Throttled(String),

    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored item does not match the record layout.
    #[error("invalid item: {reason}")]
    InvalidItem { reason: String },

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns `true` for failures that may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Unavailable(_) | Self::Io(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
