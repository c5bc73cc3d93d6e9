//! In-memory object source for tests and embedding.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tfm_types::ObjectRef;

use crate::error::FetchError;
use crate::fetcher::{FetchedObject, ObjectFetcher};

/// An in-memory implementation of [`ObjectFetcher`].
///
/// Objects live in a `HashMap` behind a `RwLock`. Bodies are shared, so
/// fetching never copies object content.
#[derive(Debug, Default)]
pub struct InMemoryObjectFetcher {
    objects: RwLock<HashMap<ObjectRef, Arc<[u8]>>>,
    unavailable: AtomicBool,
}

impl InMemoryObjectFetcher {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object.
    pub fn insert(&self, bucket: &str, key: &str, content: impl Into<Vec<u8>>) {
        let content: Vec<u8> = content.into();
        let content: Arc<[u8]> = content.into();
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(ObjectRef::new(bucket, key), content);
        }
    }

    /// Remove an object. Returns `true` if it existed.
    pub fn remove(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .write()
            .map(|mut objects| objects.remove(&ObjectRef::new(bucket, key)).is_some())
            .unwrap_or(false)
    }

    /// Number of objects held.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    /// Returns `true` if the source holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make `health_check` fail, as if the source could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl ObjectFetcher for InMemoryObjectFetcher {
    fn get(&self, object: &ObjectRef) -> Result<FetchedObject, FetchError> {
        let objects = self
            .objects
            .read()
            .map_err(|e| FetchError::Transient(format!("lock poisoned: {e}")))?;
        let content = objects.get(object).cloned().ok_or_else(|| FetchError::NotFound {
            bucket: object.bucket_name.clone(),
            key: object.file_key.clone(),
        })?;
        Ok(FetchedObject {
            byte_size: content.len() as u64,
            body: Box::new(Cursor::new(content)),
        })
    }

    fn health_check(&self) -> Result<(), FetchError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("in-memory source marked unavailable".into()));
        }
        Ok(())
    }
}
