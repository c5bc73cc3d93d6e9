//! Filesystem-backed object source.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use tfm_types::ObjectRef;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::fetcher::{FetchedObject, ObjectFetcher};

/// Object source reading `<root>/<bucket>/<key>` from local disk.
///
/// Buckets and keys must be relative paths made of normal components; a
/// key that would escape its bucket directory is reported as not found.
#[derive(Clone, Debug)]
pub struct LocalObjectFetcher {
    root: PathBuf,
    region: String,
}

impl LocalObjectFetcher {
    pub fn new(root: impl Into<PathBuf>, region: impl Into<String>) -> Self {
        let fetcher = Self {
            root: root.into(),
            region: region.into(),
        };
        info!(root = %fetcher.root.display(), region = %fetcher.region, "local object source");
        fetcher
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Resolve an object to its path, rejecting traversal outside the root.
    fn resolve(&self, object: &ObjectRef) -> Option<PathBuf> {
        if !is_contained(&object.bucket_name) || !is_contained(&object.file_key) {
            return None;
        }
        Some(self.root.join(&object.bucket_name).join(&object.file_key))
    }
}

/// Returns `true` if `segment` is a non-empty relative path that cannot
/// climb above its parent.
fn is_contained(segment: &str) -> bool {
    let path = Path::new(segment);
    let mut normal = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    normal
}

impl ObjectFetcher for LocalObjectFetcher {
    fn get(&self, object: &ObjectRef) -> Result<FetchedObject, FetchError> {
        let not_found = || FetchError::NotFound {
            bucket: object.bucket_name.clone(),
            key: object.file_key.clone(),
        };

        let path = self.resolve(object).ok_or_else(not_found)?;
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => not_found(),
            _ => FetchError::Transient(format!("{}: {e}", path.display())),
        })?;
        let metadata = file
            .metadata()
            .map_err(|e| FetchError::Transient(format!("{}: {e}", path.display())))?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        debug!(path = %path.display(), size = metadata.len(), "opened object");
        Ok(FetchedObject {
            body: Box::new(BufReader::new(file)),
            byte_size: metadata.len(),
        })
    }

    fn health_check(&self) -> Result<(), FetchError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(FetchError::Unavailable(format!(
                "source root {} is not a directory",
                self.root.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Read;

    use super::*;

    fn setup() -> (tempfile::TempDir, LocalObjectFetcher) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("uploads/docs")).unwrap();
        fs::write(dir.path().join("uploads/docs/notes.txt"), "hello world\nfoo\n").unwrap();
        let fetcher = LocalObjectFetcher::new(dir.path(), "local");
        (dir, fetcher)
    }

    #[test]
    fn reads_object_with_size() {
        let (_dir, fetcher) = setup();
        let mut fetched = fetcher
            .get(&ObjectRef::new("uploads", "docs/notes.txt"))
            .unwrap();
        assert_eq!(fetched.byte_size, 16);

        let mut body = String::new();
        fetched.body.read_to_string(&mut body).unwrap();
        assert_eq!(body, "hello world\nfoo\n");
    }

    #[test]
    fn missing_object_is_not_found() {
        let (_dir, fetcher) = setup();
        let err = fetcher
            .get(&ObjectRef::new("uploads", "docs/missing.txt"))
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn directory_is_not_an_object() {
        let (_dir, fetcher) = setup();
        let err = fetcher.get(&ObjectRef::new("uploads", "docs")).unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }

    #[test]
    fn traversal_is_rejected() {
        let (_dir, fetcher) = setup();
        for key in ["../secret.txt", "/etc/passwd", "docs/../../x.txt", ""] {
            let err = fetcher.get(&ObjectRef::new("uploads", key)).unwrap_err();
            assert!(matches!(err, FetchError::NotFound { .. }), "key {key:?}");
        }
        let err = fetcher.get(&ObjectRef::new("..", "notes.txt")).unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }

    #[test]
    fn health_check_requires_root() {
        let (dir, fetcher) = setup();
        assert!(fetcher.health_check().is_ok());

        let gone = LocalObjectFetcher::new(dir.path().join("nope"), "local");
        assert!(matches!(
            gone.health_check(),
            Err(FetchError::Unavailable(_))
        ));
    }
}
