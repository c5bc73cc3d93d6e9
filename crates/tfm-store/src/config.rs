use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Table name used when none is configured.
pub const DEFAULT_TABLE_NAME: &str = "TextFileMetrics";

/// Flush/sync strategy for journal writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write.
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    #[default]
    OsDefault,
}

/// Configuration for a metrics table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the table records are written to.
    pub table_name: String,
    /// Root directory holding one subdirectory per region.
    pub data_dir: PathBuf,
    /// Durability of individual writes.
    pub sync_mode: SyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            data_dir: PathBuf::from(".tfm/data"),
            sync_mode: SyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Journal file for this table in `region`:
    /// `<data_dir>/<region>/<table_name>.journal`.
    pub fn journal_path(&self, region: &str) -> PathBuf {
        self.data_dir
            .join(region)
            .join(format!("{}.journal", self.table_name))
    }

    /// A configuration rooted at `data_dir` with default table settings.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.table_name, "TextFileMetrics");
        assert_eq!(c.sync_mode, SyncMode::OsDefault);
    }

    #[test]
    fn journal_path_is_per_region() {
        let c = StoreConfig::in_dir("/var/tfm");
        assert_eq!(
            c.journal_path("ap-south-1"),
            PathBuf::from("/var/tfm/ap-south-1/TextFileMetrics.journal")
        );
        assert_ne!(c.journal_path("ap-south-1"), c.journal_path("eu-west-1"));
    }
}
