use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::ValidationError;
use crate::metrics::Metrics;
use crate::object::{check_identity, RecordKey};

/// The persisted metrics of one scanned object.
///
/// Identity is `(bucket_name, file_key)`. Re-processing the same object
/// produces a record at the same key that replaces the previous one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    pub file_key: String,
    pub bucket_name: String,
    /// Processing time in epoch milliseconds.
    pub upload_timestamp: i64,
    #[serde(flatten)]
    pub metrics: Metrics,
    /// Byte length reported by the object store.
    pub file_size: u64,
}

impl MetricsRecord {
    /// The composite key this record is stored under.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.bucket_name.clone(), self.file_key.clone())
    }
}

/// Assemble a record, stamping `upload_timestamp` from `clock`.
///
/// Fails only if either identity string is empty.
pub fn build_record(
    bucket_name: &str,
    file_key: &str,
    file_size: u64,
    metrics: Metrics,
    clock: &dyn Clock,
) -> Result<MetricsRecord, ValidationError> {
    check_identity(bucket_name, file_key)?;

    Ok(MetricsRecord {
        file_key: file_key.to_string(),
        bucket_name: bucket_name.to_string(),
        upload_timestamp: clock.now_millis(),
        metrics,
        file_size,
    })
}
