//! Local filesystem backend laid out as `<root>/<bucket>/<key>`.

use super::{Storage, WriteReceipt};
use crate::errors::StorageError;
use md5::{Digest, Md5};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores objects as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalFsStorage {
    root: PathBuf,
}

impl LocalFsStorage {
    /// Creates a backend rooted at `root` (made absolute against the current
    /// directory).
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path of an object.
    #[must_use]
    pub fn path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

impl Storage for LocalFsStorage {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    fn read_text(&self, bucket: &str, key: &str) -> Result<String, StorageError> {
        fs::read_to_string(self.path(bucket, key)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound {
                uri: self.uri(bucket, key),
            },
            ErrorKind::InvalidData => StorageError::Encoding {
                uri: self.uri(bucket, key),
            },
            _ => StorageError::Io(e),
        })
    }

    fn write_text(&self, bucket: &str, key: &str, data: &str) -> Result<WriteReceipt, StorageError> {
        let path = self.path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        debug!(path = %path.display(), bytes = data.len(), "Wrote local object");

        Ok(WriteReceipt {
            etag: hex::encode(Md5::digest(data.as_bytes())),
            bytes: data.len(),
        })
    }

    fn exists(&self, bucket: &str, key: &str) -> bool {
        self.path(bucket, key).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_then_read_text() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFsStorage::new(dir.path());

        let receipt = storage.write_text("lake", "raw/date=2025-10-01/a.txt", "hello").unwrap();

        assert_eq!(receipt.bytes, 5);
        assert_eq!(receipt.etag, "5d41402abc4b2a76b9719d911017c592");
        assert!(storage.exists("lake", "raw/date=2025-10-01/a.txt"));
        assert!(dir.path().join("lake/raw/date=2025-10-01/a.txt").is_file());
        assert_eq!(storage.read_text("lake", "raw/date=2025-10-01/a.txt").unwrap(), "hello");
    }

    #[test]
    fn test_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFsStorage::new(dir.path());

        assert!(!storage.exists("lake", "nope.txt"));
        let err = storage.read_text("lake", "nope.txt").unwrap_err();
        assert!(matches!(err, StorageError::NotFound { uri } if uri == "s3://lake/nope.txt"));
    }

    #[test]
    fn test_records() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFsStorage::new(dir.path());
        let records = vec![json!({"id": 1, "v": "a"}), json!({"id": 2, "v": "b"})];

        let receipt = storage.write_records("lake", "events.jsonl", &records).unwrap();
        assert_eq!(receipt.bytes, storage.read_text("lake", "events.jsonl").unwrap().len());
        assert_eq!(storage.read_records("lake", "events.jsonl").unwrap(), records);
    }

    #[test]
    fn test_root_is_absolute() {
        let storage = LocalFsStorage::new("relative_root");
        assert!(storage.root().is_absolute());
        assert_eq!(storage.uri("b", "k"), "s3://b/k");
    }
}
