use tfm_types::MetricsRecord;

use crate::error::StoreResult;

/// Persistence sink for metrics records.
///
/// All implementations must satisfy these invariants:
/// - `put` is an upsert keyed by `(bucket_name, file_key)`. A second write
///   to the same key replaces the first; it never duplicates and never fails
///   because the key already exists.
/// - Failures of the backend (throttling, unavailability, I/O) are returned
///   as errors, never reported as success.
pub trait MetricsStore: Send + Sync {
    /// Insert or replace the record at its composite key.
    fn put(&self, record: &MetricsRecord) -> StoreResult<()>;
}
