use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tfm_scan::TextScanner;
use tfm_store::StoreConfig;
use tfm_types::DEFAULT_ELIGIBLE_SUFFIX;

use crate::error::{IngestError, IngestResult};

/// Per-batch processing settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Key suffix selecting objects to scan, compared case-insensitively.
    pub eligible_suffix: String,
    /// Read buffer size used by the scanner.
    pub scan_buffer_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            eligible_suffix: DEFAULT_ELIGIBLE_SUFFIX.to_string(),
            scan_buffer_size: TextScanner::DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Where source objects are read from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory containing one subdirectory per bucket.
    pub root: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

/// Full processor configuration, usually loaded from a TOML file.
///
/// ```toml
/// region = "ap-south-1"
///
/// [source]
/// root = "/srv/buckets"
///
/// [store]
/// table_name = "TextFileMetrics"
/// data_dir = "/var/lib/tfm"
/// sync_mode = "every_write"
///
/// [ingest]
/// eligible_suffix = ".txt"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Region handed to the object source and the metrics table.
    pub region: String,
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            region: "local".to_string(),
            source: SourceConfig::default(),
            store: StoreConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn from_toml_str(text: &str) -> IngestResult<Self> {
        toml::from_str(text).map_err(|e| IngestError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> IngestResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> IngestResult<String> {
        toml::to_string(self).map_err(|e| IngestError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfm_store::SyncMode;

    #[test]
    fn empty_document_is_default() {
        let c = ProcessorConfig::from_toml_str("").unwrap();
        assert_eq!(c, ProcessorConfig::default());
        assert_eq!(c.region, "local");
        assert_eq!(c.ingest.eligible_suffix, ".txt");
        assert_eq!(c.ingest.scan_buffer_size, 8 * 1024);
        assert_eq!(c.store.table_name, "TextFileMetrics");
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let c = ProcessorConfig::from_toml_str(
            r#"
            region = "ap-south-1"

            [store]
            data_dir = "/var/lib/tfm"
            sync_mode = "every_write"
            "#,
        )
        .unwrap();
        assert_eq!(c.region, "ap-south-1");
        assert_eq!(c.store.data_dir, PathBuf::from("/var/lib/tfm"));
        assert_eq!(c.store.sync_mode, SyncMode::EveryWrite);
        assert_eq!(c.store.table_name, "TextFileMetrics");
        assert_eq!(c.source.root, PathBuf::from("."));
    }

    #[test]
    fn unknown_sync_mode_is_config_error() {
        let err = ProcessorConfig::from_toml_str("[store]\nsync_mode = \"sometimes\"").unwrap_err();
        assert!(matches!(err, IngestError::Config(_)), "got: {err}");
    }

    #[test]
    fn serialized_config_reloads() {
        let mut c = ProcessorConfig::default();
        c.region = "eu-west-1".into();
        c.ingest.eligible_suffix = ".log".into();
        let text = c.to_toml_string().unwrap();
        assert_eq!(ProcessorConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfm.toml");
        fs::write(&path, "region = \"us-east-2\"\n").unwrap();
        assert_eq!(ProcessorConfig::load(&path).unwrap().region, "us-east-2");

        let err = ProcessorConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }
}
