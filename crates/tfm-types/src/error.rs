use thiserror::Error;

/// Errors produced when constructing identity-bearing values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bucket name must not be empty")]
    EmptyBucketName,

    #[error("file key must not be empty")]
    EmptyFileKey,
}
