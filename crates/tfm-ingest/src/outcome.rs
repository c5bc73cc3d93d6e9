use std::time::Duration;

use serde::Serialize;
use tfm_types::{MetricsRecord, ObjectRef};
use uuid::Uuid;

use crate::error::ErrorKind;

/// Pipeline step at which an item failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    /// Identity check, before anything is fetched.
    Validate,
    Fetch,
    Scan,
    Record,
    Store,
}

/// Terminal state of one item.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// The record was built and stored.
    Succeeded { record: MetricsRecord },
    /// The item was filtered out before fetching.
    Skipped { reason: String },
    /// A pipeline step failed; later steps were not run.
    Failed {
        stage: ItemStage,
        kind: ErrorKind,
        message: String,
    },
}

/// Outcome of one input item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub object: ObjectRef,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn is_succeeded(&self) -> bool {
        matches!(self.status, ItemStatus::Succeeded { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, ItemStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ItemStatus::Failed { .. })
    }

    /// The stored record, if the item succeeded.
    pub fn record(&self) -> Option<&MetricsRecord> {
        match &self.status {
            ItemStatus::Succeeded { record } => Some(record),
            _ => None,
        }
    }

    /// The error kind, if the item failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.status {
            ItemStatus::Failed { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// The result of processing one batch: one outcome per input item, in
/// input order.
#[derive(Clone, Debug, Serialize)]
pub struct BatchResult {
    /// Identifier correlating this batch's log lines.
    pub batch_id: Uuid,
    pub outcomes: Vec<ItemOutcome>,
    /// Total wall-clock time for the batch.
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_succeeded()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Returns `true` if no item failed.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfm_types::Metrics;

    fn outcomes() -> Vec<ItemOutcome> {
        vec![
            ItemOutcome {
                object: ObjectRef::new("b", "a.txt"),
                status: ItemStatus::Succeeded {
                    record: MetricsRecord {
                        file_key: "a.txt".into(),
                        bucket_name: "b".into(),
                        upload_timestamp: 1,
                        metrics: Metrics::new(1, 1, 1),
                        file_size: 2,
                    },
                },
            },
            ItemOutcome {
                object: ObjectRef::new("b", "a.md"),
                status: ItemStatus::Skipped {
                    reason: "not a .txt object".into(),
                },
            },
            ItemOutcome {
                object: ObjectRef::new("b", "c.txt"),
                status: ItemStatus::Failed {
                    stage: ItemStage::Fetch,
                    kind: ErrorKind::FetchError,
                    message: "object not found: b/c.txt".into(),
                },
            },
        ]
    }

    #[test]
    fn counters() {
        let result = BatchResult {
            batch_id: Uuid::nil(),
            outcomes: outcomes(),
            elapsed: Duration::from_millis(3),
        };
        assert_eq!(result.len(), 3);
        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.skipped(), 1);
        assert_eq!(result.failed(), 1);
        assert!(!result.is_clean());
    }

    #[test]
    fn accessors() {
        let all = outcomes();
        assert_eq!(all[0].record().map(|r| r.file_size), Some(2));
        assert!(all[1].record().is_none());
        assert_eq!(all[2].error_kind(), Some(ErrorKind::FetchError));
        assert_eq!(all[0].error_kind(), None);
    }

    #[test]
    fn json_shape() {
        let all = outcomes();
        let json = serde_json::to_value(&all).unwrap();
        assert_eq!(json[0]["status"], "succeeded");
        assert_eq!(json[0]["object"]["fileKey"], "a.txt");
        assert_eq!(json[0]["record"]["lineCount"], 1);
        assert_eq!(json[1]["status"], "skipped");
        assert_eq!(json[2]["status"], "failed");
        assert_eq!(json[2]["stage"], "fetch");
        assert_eq!(json[2]["kind"], "FetchError");
    }
}
