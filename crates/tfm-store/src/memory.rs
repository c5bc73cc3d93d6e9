use std::collections::HashMap;
use std::sync::RwLock;

use tfm_types::{MetricsRecord, RecordKey};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::item::{self, Item};
use crate::traits::MetricsStore;

/// In-memory, HashMap-based metrics table.
///
/// Intended for tests and embedding. Items are held in their persisted
/// layout behind a `RwLock`.
pub struct InMemoryMetricsStore {
    items: RwLock<HashMap<RecordKey, Item>>,
}

impl InMemoryMetricsStore {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Number of items currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        let items = self.items.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(items.len())
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Read the record stored at `key`.
    pub fn get(&self, key: &RecordKey) -> StoreResult<Option<MetricsRecord>> {
        let items = self.items.read().map_err(|_| StoreError::LockPoisoned)?;
        items.get(key).map(item::from_item).transpose()
    }

    /// Raw item stored at `key`, in persisted layout.
    pub fn item(&self, key: &RecordKey) -> StoreResult<Option<Item>> {
        let items = self.items.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(items.get(key).cloned())
    }

    /// All records, sorted by key.
    pub fn records(&self) -> StoreResult<Vec<MetricsRecord>> {
        let items = self.items.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut keys: Vec<&RecordKey> = items.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| item::from_item(&items[key]))
            .collect()
    }
}

impl Default for InMemoryMetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsStore for InMemoryMetricsStore {
    fn put(&self, record: &MetricsRecord) -> StoreResult<()> {
        let key = record.key();
        let encoded = item::to_item(record);
        let mut items = self.items.write().map_err(|_| StoreError::LockPoisoned)?;
        let replaced = items.insert(key, encoded).is_some();
        debug!(bucket = %record.bucket_name, key = %record.file_key, replaced, "item put");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryMetricsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("InMemoryMetricsStore");
        match self.len() {
            Ok(count) => out.field("item_count", &count),
            Err(_) => out.field("item_count", &"<poisoned>"),
        };
        out.finish()
    }
}
