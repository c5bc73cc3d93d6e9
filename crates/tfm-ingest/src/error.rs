use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use tfm_scan::ScanError;
use tfm_store::StoreError;
use tfm_types::ValidationError;

/// Errors from object fetchers.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The object could not be read right now.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// The object source as a whole cannot be reached.
    #[error("object source unavailable: {0}")]
    Unavailable(String),
}

/// Classification of a per-item failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The object is not valid UTF-8 text.
    DecodeError,
    /// Reading the object stream failed.
    IoError,
    /// The object identity is malformed.
    ValidationError,
    /// Persisting the record failed.
    StoreError,
    /// The object could not be fetched.
    FetchError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DecodeError => "DecodeError",
            Self::IoError => "IOError",
            Self::ValidationError => "ValidationError",
            Self::StoreError => "StoreError",
            Self::FetchError => "FetchError",
        };
        f.write_str(name)
    }
}

/// Any failure inside one item's fetch → scan → record → store pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ItemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch(_) => ErrorKind::FetchError,
            Self::Scan(ScanError::Decode { .. }) => ErrorKind::DecodeError,
            Self::Scan(ScanError::Io(_)) => ErrorKind::IoError,
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Store(_) => ErrorKind::StoreError,
        }
    }
}

/// Errors that fail a whole batch before per-item processing begins.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Unavailable(FetchError),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for batch-level operations.
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_error_kinds() {
        let fetch: ItemError = FetchError::Transient("timeout".into()).into();
        assert_eq!(fetch.kind(), ErrorKind::FetchError);

        let decode: ItemError = ScanError::Decode { offset: 3 }.into();
        assert_eq!(decode.kind(), ErrorKind::DecodeError);

        let io: ItemError = ScanError::Io(io::Error::other("reset")).into();
        assert_eq!(io.kind(), ErrorKind::IoError);

        let validation: ItemError = ValidationError::EmptyFileKey.into();
        assert_eq!(validation.kind(), ErrorKind::ValidationError);

        let store: ItemError = StoreError::Throttled("slow down".into()).into();
        assert_eq!(store.kind(), ErrorKind::StoreError);
    }

    #[test]
    fn messages_pass_through() {
        let err: ItemError = ScanError::Decode { offset: 7 }.into();
        assert_eq!(err.to_string(), "invalid UTF-8 sequence at byte offset 7");
        assert_eq!(ErrorKind::IoError.to_string(), "IOError");
    }
}
