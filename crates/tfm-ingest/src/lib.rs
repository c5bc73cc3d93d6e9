//! Event-driven ingestion of text objects.
//!
//! An [`IngestionHandler`] takes a batch of object references (usually
//! decoded from an [`ObjectCreatedEvent`]) and, for every object whose key
//! ends with the eligible suffix, runs:
//!
//! ```text
//! fetch (ObjectFetcher) -> scan (TextScanner) -> record (build_record) -> store (MetricsStore)
//! ```
//!
//! Every input item yields exactly one [`ItemOutcome`]: `Succeeded`,
//! `Skipped`, or `Failed` with the stage and [`ErrorKind`] that stopped it.
//! Only an unreachable object source fails the batch as a whole.
//!
//! # Object Sources
//!
//! All sources implement the [`ObjectFetcher`] trait:
//!
//! - [`InMemoryObjectFetcher`] -- `HashMap`-based source for tests and embedding
//! - [`LocalObjectFetcher`] -- reads `<root>/<bucket>/<key>` from local disk

pub mod config;
pub mod error;
pub mod event;
pub mod fetcher;
pub mod handler;
pub mod local;
pub mod memory;
pub mod outcome;

pub use config::{IngestConfig, ProcessorConfig, SourceConfig};
pub use error::{ErrorKind, FetchError, IngestError, IngestResult, ItemError};
pub use event::ObjectCreatedEvent;
pub use fetcher::{FetchedObject, ObjectFetcher};
pub use handler::IngestionHandler;
pub use local::LocalObjectFetcher;
pub use memory::InMemoryObjectFetcher;
pub use outcome::{BatchResult, ItemOutcome, ItemStage, ItemStatus};
