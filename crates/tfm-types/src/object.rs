use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Suffix of keys eligible for scanning, compared case-insensitively.
pub const DEFAULT_ELIGIBLE_SUFFIX: &str = ".txt";

/// Reference to an object in a bucket, as delivered by an event batch.
///
/// Keys are expected to be URL-decoded already.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub bucket_name: String,
    pub file_key: String,
}

impl ObjectRef {
    pub fn new(bucket_name: impl Into<String>, file_key: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            file_key: file_key.into(),
        }
    }

    /// Returns `true` if the key's lower-cased form ends with `suffix`.
    ///
    /// `suffix` is lower-cased as well, so `".TXT"` and `".txt"` behave the
    /// same way.
    ///
    /// ```
    /// use tfm_types::ObjectRef;
    ///
    /// assert!(ObjectRef::new("b", "notes.TXT").is_eligible(".txt"));
    /// assert!(!ObjectRef::new("b", "archive.txt.gz").is_eligible(".txt"));
    /// ```
    pub fn is_eligible(&self, suffix: &str) -> bool {
        self.file_key
            .to_lowercase()
            .ends_with(&suffix.to_lowercase())
    }

    /// Check that both identity strings are non-empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_identity(&self.bucket_name, &self.file_key)
    }

    /// The composite persistence key for this object.
    pub fn record_key(&self) -> RecordKey {
        RecordKey {
            bucket_name: self.bucket_name.clone(),
            file_key: self.file_key.clone(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket_name, self.file_key)
    }
}

/// Shared identity rule for object references and records.
pub(crate) fn check_identity(bucket_name: &str, file_key: &str) -> Result<(), ValidationError> {
    if bucket_name.is_empty() {
        return Err(ValidationError::EmptyBucketName);
    }
    if file_key.is_empty() {
        return Err(ValidationError::EmptyFileKey);
    }
    Ok(())
}

/// Composite primary key of a persisted metrics record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub bucket_name: String,
    pub file_key: String,
}

impl RecordKey {
    pub fn new(bucket_name: impl Into<String>, file_key: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            file_key: file_key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket_name, self.file_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_is_case_insensitive() {
        assert!(ObjectRef::new("b", "notes.TXT").is_eligible(DEFAULT_ELIGIBLE_SUFFIX));
        assert!(ObjectRef::new("b", "dir/Notes.Txt").is_eligible(DEFAULT_ELIGIBLE_SUFFIX));
        assert!(ObjectRef::new("b", "notes.txt").is_eligible(".TXT"));
    }

    #[test]
    fn other_suffixes_are_not_eligible() {
        assert!(!ObjectRef::new("b", "notes.md").is_eligible(DEFAULT_ELIGIBLE_SUFFIX));
        assert!(!ObjectRef::new("b", "archive.txt.gz").is_eligible(DEFAULT_ELIGIBLE_SUFFIX));
        assert!(!ObjectRef::new("b", "txt").is_eligible(DEFAULT_ELIGIBLE_SUFFIX));
    }

    #[test]
    fn validate_rejects_empty_identity() {
        assert!(ObjectRef::new("b", "a.txt").validate().is_ok());
        assert!(matches!(
            ObjectRef::new("", "a.txt").validate(),
            Err(ValidationError::EmptyBucketName)
        ));
        assert!(matches!(
            ObjectRef::new("b", "").validate(),
            Err(ValidationError::EmptyFileKey)
        ));
    }

    #[test]
    fn record_key_matches_identity() {
        let obj = ObjectRef::new("bucket", "a/b.txt");
        assert_eq!(obj.record_key(), RecordKey::new("bucket", "a/b.txt"));
        assert_eq!(obj.to_string(), "bucket/a/b.txt");
    }
}
