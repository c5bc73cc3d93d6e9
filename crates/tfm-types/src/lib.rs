//! Foundation types for text file metrics.
//!
//! Every other `tfm-*` crate depends on `tfm-types`.
//!
//! # Key Types
//!
//! - [`ObjectRef`] -- Identity of a source object: `(bucket_name, file_key)`
//! - [`Metrics`] -- Line, word, and character counts produced by a scan
//! - [`MetricsRecord`] -- Persisted record binding identity, metrics, and provenance
//! - [`Clock`] -- Injected source of processing timestamps
//! - [`ValidationError`] -- Malformed identity strings

pub mod clock;
pub mod error;
pub mod metrics;
pub mod object;
pub mod record;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ValidationError;
pub use metrics::Metrics;
pub use object::{ObjectRef, RecordKey, DEFAULT_ELIGIBLE_SUFFIX};
pub use record::{build_record, MetricsRecord};
