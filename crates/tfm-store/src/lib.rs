//! Key-value persistence for text file metrics.
//!
//! Records are stored as typed attribute items under the composite primary
//! key `(bucketName, fileKey)`. Every write is an upsert: writing the same
//! key twice leaves exactly one item holding the second write's attributes.
//!
//! # Item Layout
//!
//! | attribute        | type |
//! |------------------|------|
//! | `fileKey`        | `S`  |
//! | `bucketName`     | `S`  |
//! | `uploadTimestamp`| `N`  |
//! | `lineCount`      | `N`  |
//! | `wordCount`      | `N`  |
//! | `characterCount` | `N`  |
//! | `fileSize`       | `N`  |
//!
//! # Storage Backends
//!
//! All backends implement the [`MetricsStore`] trait:
//!
//! - [`InMemoryMetricsStore`] -- `HashMap`-based table for tests and embedding
//! - [`JournalMetricsStore`] -- append-only, CRC-framed journal replayed on open

pub mod config;
pub mod error;
pub mod item;
pub mod journal;
pub mod memory;
pub mod traits;

pub use config::{StoreConfig, SyncMode, DEFAULT_TABLE_NAME};
pub use error::{StoreError, StoreResult};
pub use item::{AttributeValue, Item};
pub use journal::JournalMetricsStore;
pub use memory::InMemoryMetricsStore;
pub use traits::MetricsStore;
