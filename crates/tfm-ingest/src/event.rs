//! Object-created notification payloads.
//!
//! Notifications arrive as JSON with a top-level `Records` array. Object
//! keys in notifications are form-URL-encoded (`+` for space, `%XX`
//! escapes); [`ObjectCreatedEvent::object_refs`] decodes them so the rest of
//! the pipeline only sees plain keys.

use std::io::Read;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tfm_types::ObjectRef;
use tracing::debug;

use crate::error::{IngestError, IngestResult};

/// Prefix of event names announcing a newly created object.
const OBJECT_CREATED_PREFIX: &str = "ObjectCreated:";

/// A batch of object notifications.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCreatedEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: String,
    pub s3: ObjectEntity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntity {
    pub bucket: BucketInfo,
    pub object: ObjectInfo,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// URL-encoded object key.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl EventRecord {
    /// Returns `true` if this record announces a created object.
    ///
    /// A missing or empty event name is not a creation.
    pub fn is_object_created(&self) -> bool {
        self.event_name.starts_with(OBJECT_CREATED_PREFIX)
    }
}

impl ObjectCreatedEvent {
    /// Parse a notification from JSON text.
    pub fn from_json(json: &str) -> IngestResult<Self> {
        serde_json::from_str(json).map_err(|e| IngestError::MalformedEvent(e.to_string()))
    }

    /// Parse a notification from a reader.
    pub fn from_reader<R: Read>(reader: R) -> IngestResult<Self> {
        serde_json::from_reader(reader).map_err(|e| IngestError::MalformedEvent(e.to_string()))
    }

    /// Decoded object references of every creation record, in order.
    pub fn object_refs(&self) -> IngestResult<Vec<ObjectRef>> {
        let mut refs = Vec::with_capacity(self.records.len());
        for record in &self.records {
            if !record.is_object_created() {
                debug!(event = %record.event_name, key = %record.s3.object.key, "ignoring non-creation record");
                continue;
            }
            let key = decode_key(&record.s3.object.key)?;
            refs.push(ObjectRef::new(record.s3.bucket.name.clone(), key));
        }
        Ok(refs)
    }
}

/// Decode a form-URL-encoded object key.
///
/// ```
/// use tfm_ingest::event::decode_key;
///
/// assert_eq!(decode_key("my+notes%2C+v2.txt").unwrap(), "my notes, v2.txt");
/// ```
pub fn decode_key(raw: &str) -> IngestResult<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|e| IngestError::MalformedEvent(format!("object key {raw:?} is not UTF-8: {e}")))
}
