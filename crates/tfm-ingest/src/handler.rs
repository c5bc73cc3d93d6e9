use std::sync::Arc;
use std::time::Instant;

use tfm_scan::TextScanner;
use tfm_store::MetricsStore;
use tfm_types::{build_record, Clock, MetricsRecord, ObjectRef, SystemClock};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::{IngestError, IngestResult, ItemError};
use crate::event::ObjectCreatedEvent;
use crate::fetcher::ObjectFetcher;
use crate::outcome::{BatchResult, ItemOutcome, ItemStage, ItemStatus};

/// Processes batches of object references: filter, fetch, scan, record,
/// store.
///
/// Items run sequentially in input order. Each item's pipeline is isolated:
/// a failure is recorded in that item's outcome and the batch moves on.
/// A record is only built after its scan completes, so a failed item never
/// leaves a partial record behind.
pub struct IngestionHandler {
    fetcher: Arc<dyn ObjectFetcher>,
    store: Arc<dyn MetricsStore>,
    clock: Arc<dyn Clock>,
    scanner: TextScanner,
    config: IngestConfig,
}

impl IngestionHandler {
    /// Create a handler stamping records with the system clock.
    pub fn new(
        fetcher: Arc<dyn ObjectFetcher>,
        store: Arc<dyn MetricsStore>,
        config: IngestConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            clock: Arc::new(SystemClock),
            scanner: TextScanner::with_buffer_size(config.scan_buffer_size),
            config,
        }
    }

    /// Replace the clock used to stamp `upload_timestamp`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The current configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Process every item of `batch` and return one outcome per item.
    ///
    /// Fails only if the object source is unreachable before any item is
    /// attempted. Per-item failures are reported in the result.
    pub fn process(&self, batch: &[ObjectRef]) -> IngestResult<BatchResult> {
        let batch_id = Uuid::now_v7();
        let span = info_span!("batch", %batch_id, items = batch.len());
        let _guard = span.enter();
        let start = Instant::now();

        self.fetcher.health_check().map_err(|e| {
            warn!(error = %e, "object source unavailable; batch not started");
            IngestError::Unavailable(e)
        })?;

        let outcomes: Vec<ItemOutcome> = batch.iter().map(|object| self.process_item(object)).collect();
        let result = BatchResult {
            batch_id,
            outcomes,
            elapsed: start.elapsed(),
        };

        info!(
            succeeded = result.succeeded(),
            skipped = result.skipped(),
            failed = result.failed(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "batch complete"
        );
        Ok(result)
    }

    /// Decode a notification and process its creation records.
    pub fn process_event(&self, event: &ObjectCreatedEvent) -> IngestResult<BatchResult> {
        let batch = event.object_refs()?;
        self.process(&batch)
    }

    fn process_item(&self, object: &ObjectRef) -> ItemOutcome {
        let span = info_span!("item", bucket = %object.bucket_name, key = %object.file_key);
        let _guard = span.enter();

        if !object.is_eligible(&self.config.eligible_suffix) {
            info!("skipping ineligible object");
            return ItemOutcome {
                object: object.clone(),
                status: ItemStatus::Skipped {
                    reason: format!("key does not end with {}", self.config.eligible_suffix),
                },
            };
        }

        let status = match self.run_pipeline(object) {
            Ok(record) => {
                info!(
                    lines = record.metrics.line_count,
                    words = record.metrics.word_count,
                    chars = record.metrics.character_count,
                    size = record.file_size,
                    "stored metrics"
                );
                ItemStatus::Succeeded { record }
            }
            Err((stage, err)) => {
                let kind = err.kind();
                warn!(?stage, %kind, error = %err, "item failed");
                ItemStatus::Failed {
                    stage,
                    kind,
                    message: err.to_string(),
                }
            }
        };

        ItemOutcome {
            object: object.clone(),
            status,
        }
    }

    /// Validate → fetch → scan → record → store. Stops at the first failing
    /// stage.
    fn run_pipeline(&self, object: &ObjectRef) -> Result<MetricsRecord, (ItemStage, ItemError)> {
        object
            .validate()
            .map_err(|e| (ItemStage::Validate, e.into()))?;

        let fetched = self
            .fetcher
            .get(object)
            .map_err(|e| (ItemStage::Fetch, e.into()))?;

        let metrics = self
            .scanner
            .scan(fetched.body)
            .map_err(|e| (ItemStage::Scan, e.into()))?;

        let record = build_record(
            &object.bucket_name,
            &object.file_key,
            fetched.byte_size,
            metrics,
            self.clock.as_ref(),
        )
        .map_err(|e| (ItemStage::Record, e.into()))?;

        self.store
            .put(&record)
            .map_err(|e| (ItemStage::Store, e.into()))?;

        Ok(record)
    }
}

impl std::fmt::Debug for IngestionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionHandler")
            .field("scanner", &self.scanner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tfm_store::{InMemoryMetricsStore, StoreError, StoreResult};
    use tfm_types::{FixedClock, Metrics, RecordKey};

    use super::*;
    use crate::error::ErrorKind;
    use crate::local::LocalObjectFetcher;
    use crate::memory::InMemoryObjectFetcher;

    /// Store failing every put with a transient error.
    struct ThrottledStore;

    impl MetricsStore for ThrottledStore {
        fn put(&self, _record: &MetricsRecord) -> StoreResult<()> {
            Err(StoreError::Throttled("rate exceeded".into()))
        }
    }

    /// Store recording the order of writes.
    #[derive(Default)]
    struct RecordingStore {
        keys: Mutex<Vec<String>>,
    }

    impl MetricsStore for RecordingStore {
        fn put(&self, record: &MetricsRecord) -> StoreResult<()> {
            self.keys.lock().unwrap().push(record.file_key.clone());
            Ok(())
        }
    }

    fn handler_with(
        fetcher: Arc<InMemoryObjectFetcher>,
        store: Arc<dyn MetricsStore>,
    ) -> IngestionHandler {
        IngestionHandler::new(fetcher, store, IngestConfig::default())
            .with_clock(Arc::new(FixedClock(1_700_000_000_000)))
    }

    fn setup() -> (Arc<InMemoryObjectFetcher>, Arc<InMemoryMetricsStore>, IngestionHandler) {
        let fetcher = Arc::new(InMemoryObjectFetcher::new());
        let store = Arc::new(InMemoryMetricsStore::new());
        let handler = handler_with(fetcher.clone(), store.clone());
        (fetcher, store, handler)
    }

    #[test]
    fn scans_and_stores_eligible_object() {
        let (fetcher, store, handler) = setup();
        fetcher.insert("uploads", "notes.txt", "hello world\nfoo\n");

        let result = handler
            .process(&[ObjectRef::new("uploads", "notes.txt")])
            .unwrap();

        assert_eq!(result.len(), 1);
        let record = result.outcomes[0].record().unwrap();
        assert_eq!(record.metrics, Metrics::new(2, 3, 14));
        assert_eq!(record.file_size, 16);
        assert_eq!(record.upload_timestamp, 1_700_000_000_000);

        let stored = store
            .get(&RecordKey::new("uploads", "notes.txt"))
            .unwrap()
            .unwrap();
        assert_eq!(&stored, record);
    }

    #[test]
    fn filtering_by_suffix() {
        let (fetcher, store, handler) = setup();
        fetcher.insert("b", "notes.TXT", "a b c");
        fetcher.insert("b", "notes.md", "# heading");
        fetcher.insert("b", "archive.txt.gz", "\x1f\u{8b}");

        let result = handler
            .process(&[
                ObjectRef::new("b", "notes.TXT"),
                ObjectRef::new("b", "notes.md"),
                ObjectRef::new("b", "archive.txt.gz"),
            ])
            .unwrap();

        assert!(result.outcomes[0].is_succeeded());
        assert!(result.outcomes[1].is_skipped());
        assert!(result.outcomes[2].is_skipped());
        assert_eq!(store.len().unwrap(), 1);
        assert!(result.is_clean());
    }

    #[test]
    fn failed_fetch_is_isolated() {
        let (fetcher, store, handler) = setup();
        fetcher.insert("b", "one.txt", "first\n");
        fetcher.insert("b", "three.txt", "third file\n");

        let result = handler
            .process(&[
                ObjectRef::new("b", "one.txt"),
                ObjectRef::new("b", "two.txt"),
                ObjectRef::new("b", "three.txt"),
            ])
            .unwrap();

        assert_eq!(result.len(), 3);
        assert!(result.outcomes[0].is_succeeded());
        assert!(result.outcomes[2].is_succeeded());
        match &result.outcomes[1].status {
            ItemStatus::Failed {
                stage,
                kind,
                message,
            } => {
                assert_eq!(*stage, ItemStage::Fetch);
                assert_eq!(*kind, ErrorKind::FetchError);
                assert!(message.contains("two.txt"), "message: {message}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(result.failed(), 1);
    }

    #[test]
    fn invalid_utf8_fails_with_decode_and_stores_nothing() {
        let (fetcher, store, handler) = setup();
        fetcher.insert("b", "binary.txt", vec![b'o', b'k', 0xC3, 0x28]);

        let result = handler
            .process(&[ObjectRef::new("b", "binary.txt")])
            .unwrap();

        assert_eq!(result.outcomes[0].error_kind(), Some(ErrorKind::DecodeError));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn empty_bucket_name_fails_validation() {
        let (fetcher, store, handler) = setup();
        fetcher.insert("", "a.txt", "text");

        let result = handler.process(&[ObjectRef::new("", "a.txt")]).unwrap();

        match &result.outcomes[0].status {
            ItemStatus::Failed { stage, kind, .. } => {
                assert_eq!(*stage, ItemStage::Validate);
                assert_eq!(*kind, ErrorKind::ValidationError);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn empty_bucket_is_rejected_before_local_fetch() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("a.txt"), "text").unwrap();
        let store = Arc::new(InMemoryMetricsStore::new());
        let handler = IngestionHandler::new(
            Arc::new(LocalObjectFetcher::new(root.path(), "local")),
            store.clone(),
            IngestConfig::default(),
        );

        let result = handler.process(&[ObjectRef::new("", "a.txt")]).unwrap();

        assert_eq!(result.outcomes[0].error_kind(), Some(ErrorKind::ValidationError));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn store_failure_is_reported_not_masked() {
        let fetcher = Arc::new(InMemoryObjectFetcher::new());
        fetcher.insert("b", "a.txt", "text");
        fetcher.insert("b", "b.txt", "more text");
        let handler = handler_with(fetcher, Arc::new(ThrottledStore));

        let result = handler
            .process(&[ObjectRef::new("b", "a.txt"), ObjectRef::new("b", "b.txt")])
            .unwrap();

        assert_eq!(result.failed(), 2);
        for outcome in &result.outcomes {
            assert_eq!(outcome.error_kind(), Some(ErrorKind::StoreError));
        }
    }

    #[test]
    fn reprocessing_overwrites_record() {
        let fetcher = Arc::new(InMemoryObjectFetcher::new());
        let store = Arc::new(InMemoryMetricsStore::new());
        fetcher.insert("b", "a.txt", "one\n");

        handler_with(fetcher.clone(), store.clone())
            .process(&[ObjectRef::new("b", "a.txt")])
            .unwrap();

        fetcher.insert("b", "a.txt", "one\ntwo three\n");
        let later = IngestionHandler::new(fetcher, store.clone(), IngestConfig::default())
            .with_clock(Arc::new(FixedClock(1_800_000_000_000)));
        later.process(&[ObjectRef::new("b", "a.txt")]).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let stored = store.get(&RecordKey::new("b", "a.txt")).unwrap().unwrap();
        assert_eq!(stored.metrics, Metrics::new(2, 3, 12));
        assert_eq!(stored.upload_timestamp, 1_800_000_000_000);
    }

    #[test]
    fn writes_follow_input_order() {
        let fetcher = Arc::new(InMemoryObjectFetcher::new());
        for key in ["c.txt", "a.txt", "b.txt"] {
            fetcher.insert("b", key, key);
        }
        let store = Arc::new(RecordingStore::default());
        let handler = handler_with(fetcher, store.clone());

        handler
            .process(&[
                ObjectRef::new("b", "c.txt"),
                ObjectRef::new("b", "a.txt"),
                ObjectRef::new("b", "b.txt"),
            ])
            .unwrap();

        assert_eq!(*store.keys.lock().unwrap(), vec!["c.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn unavailable_source_fails_batch() {
        let (fetcher, store, handler) = setup();
        fetcher.insert("b", "a.txt", "text");
        fetcher.set_unavailable(true);

        let err = handler.process(&[ObjectRef::new("b", "a.txt")]).unwrap_err();
        assert!(matches!(err, IngestError::Unavailable(_)), "got: {err}");
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn empty_batch_is_empty_result() {
        let (_fetcher, _store, handler) = setup();
        let result = handler.process(&[]).unwrap();
        assert!(result.is_empty());
        assert!(result.is_clean());
    }

    #[test]
    fn custom_suffix() {
        let fetcher = Arc::new(InMemoryObjectFetcher::new());
        let store = Arc::new(InMemoryMetricsStore::new());
        fetcher.insert("b", "app.LOG", "line one\nline two\n");
        let config = IngestConfig {
            eligible_suffix: ".log".into(),
            ..IngestConfig::default()
        };
        let handler = IngestionHandler::new(fetcher, store.clone(), config);

        let result = handler
            .process(&[ObjectRef::new("b", "app.LOG"), ObjectRef::new("b", "a.txt")])
            .unwrap();
        assert!(result.outcomes[0].is_succeeded());
        assert!(result.outcomes[1].is_skipped());
        assert_eq!(store.len().unwrap(), 1);
    }
}
