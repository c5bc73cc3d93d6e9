use std::io;

/// Errors produced while scanning a text stream.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The stream is not valid UTF-8.
    #[error("invalid UTF-8 sequence at byte offset {offset}")]
    Decode { offset: u64 },

    /// Reading from the underlying stream failed.
    #[error("read error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the scan crate.
pub type ScanResult<T> = std::result::Result<T, ScanError>;
