//! Typed attribute items: the persisted layout of a [`MetricsRecord`].
//!
//! Attribute names and types are a compatibility contract with existing
//! tables and must not change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tfm_types::{Metrics, MetricsRecord, RecordKey};

use crate::error::{StoreError, StoreResult};

pub const ATTR_FILE_KEY: &str = "fileKey";
pub const ATTR_BUCKET_NAME: &str = "bucketName";
pub const ATTR_UPLOAD_TIMESTAMP: &str = "uploadTimestamp";
pub const ATTR_LINE_COUNT: &str = "lineCount";
pub const ATTR_WORD_COUNT: &str = "wordCount";
pub const ATTR_CHARACTER_COUNT: &str = "characterCount";
pub const ATTR_FILE_SIZE: &str = "fileSize";

/// A single typed attribute value.
///
/// Serializes as `{"S": "..."}` or `{"N": "..."}`. Numbers are carried as
/// their decimal string form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    pub fn number(value: impl ToString) -> Self {
        Self::N(value.to_string())
    }
}

/// An item: attribute name to value, ordered by name.
pub type Item = BTreeMap<String, AttributeValue>;

/// Encode a record into its item layout.
pub fn to_item(record: &MetricsRecord) -> Item {
    let mut item = Item::new();
    item.insert(ATTR_FILE_KEY.into(), AttributeValue::string(&record.file_key));
    item.insert(
        ATTR_BUCKET_NAME.into(),
        AttributeValue::string(&record.bucket_name),
    );
    item.insert(
        ATTR_UPLOAD_TIMESTAMP.into(),
        AttributeValue::number(record.upload_timestamp),
    );
    item.insert(
        ATTR_LINE_COUNT.into(),
        AttributeValue::number(record.metrics.line_count),
    );
    item.insert(
        ATTR_WORD_COUNT.into(),
        AttributeValue::number(record.metrics.word_count),
    );
    item.insert(
        ATTR_CHARACTER_COUNT.into(),
        AttributeValue::number(record.metrics.character_count),
    );
    item.insert(ATTR_FILE_SIZE.into(), AttributeValue::number(record.file_size));
    item
}

/// Decode an item back into a record.
pub fn from_item(item: &Item) -> StoreResult<MetricsRecord> {
    Ok(MetricsRecord {
        file_key: string_attr(item, ATTR_FILE_KEY)?,
        bucket_name: string_attr(item, ATTR_BUCKET_NAME)?,
        upload_timestamp: number_attr(item, ATTR_UPLOAD_TIMESTAMP)?,
        metrics: Metrics {
            line_count: number_attr(item, ATTR_LINE_COUNT)?,
            word_count: number_attr(item, ATTR_WORD_COUNT)?,
            character_count: number_attr(item, ATTR_CHARACTER_COUNT)?,
        },
        file_size: number_attr(item, ATTR_FILE_SIZE)?,
    })
}

/// Extract the composite primary key of an item.
pub fn key_of(item: &Item) -> StoreResult<RecordKey> {
    Ok(RecordKey::new(
        string_attr(item, ATTR_BUCKET_NAME)?,
        string_attr(item, ATTR_FILE_KEY)?,
    ))
}

fn string_attr(item: &Item, name: &str) -> StoreResult<String> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Ok(value.clone()),
        Some(AttributeValue::N(_)) => Err(StoreError::InvalidItem {
            reason: format!("attribute {name} must be a string"),
        }),
        None => Err(StoreError::InvalidItem {
            reason: format!("missing attribute {name}"),
        }),
    }
}

fn number_attr<T: std::str::FromStr>(item: &Item, name: &str) -> StoreResult<T> {
    match item.get(name) {
        Some(AttributeValue::N(value)) => value.parse().map_err(|_| StoreError::InvalidItem {
            reason: format!("attribute {name} is not a valid number: {value:?}"),
        }),
        Some(AttributeValue::S(_)) => Err(StoreError::InvalidItem {
            reason: format!("attribute {name} must be a number"),
        }),
        None => Err(StoreError::InvalidItem {
            reason: format!("missing attribute {name}"),
        }),
    }
}
