use std::io::Read;

use tfm_types::ObjectRef;

use crate::error::FetchError;

/// An object opened for reading.
pub struct FetchedObject {
    /// Byte stream of the object's content.
    pub body: Box<dyn Read + Send>,
    /// Total byte length as reported by the object source.
    pub byte_size: u64,
}

impl std::fmt::Debug for FetchedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedObject")
            .field("byte_size", &self.byte_size)
            .finish_non_exhaustive()
    }
}

/// Read access to an object source addressed by `(bucket, key)`.
///
/// Implementations must be thread-safe (`Send + Sync`). Bodies are streamed;
/// a fetcher should not buffer whole objects when its backend can stream.
pub trait ObjectFetcher: Send + Sync {
    /// Open the object for reading.
    fn get(&self, object: &ObjectRef) -> Result<FetchedObject, FetchError>;

    /// Check that the source can be reached at all.
    ///
    /// Called once per batch before any item is processed. The default
    /// implementation always succeeds.
    fn health_check(&self) -> Result<(), FetchError> {
        Ok(())
    }
}
