//! Storage backends for task data.
//!
//! Tasks read and write text objects and JSON-lines record files addressed by
//! bucket and key. The backend is either a local directory tree or an
//! S3-compatible object store, chosen by [`SdkConfig::storage_backend`].

mod local;
mod object_store;

pub use local::LocalFsStorage;
pub use object_store::{Credentials, ObjectStoreStorage};

use crate::config::{SdkConfig, StorageBackend};
use crate::errors::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result of a write: content fingerprint and size in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    /// Content fingerprint (MD5 hex locally, the store's ETag remotely).
    pub etag: String,
    /// Number of bytes written.
    pub bytes: usize,
}

/// Text and record storage addressed by bucket and key.
pub trait Storage: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Reads a UTF-8 text object.
    fn read_text(&self, bucket: &str, key: &str) -> Result<String, StorageError>;

    /// Writes a UTF-8 text object, creating or replacing it.
    fn write_text(&self, bucket: &str, key: &str, data: &str) -> Result<WriteReceipt, StorageError>;

    /// Returns true if the object exists.
    fn exists(&self, bucket: &str, key: &str) -> bool;

    /// Object URI: `s3://<bucket>/<key>`.
    fn uri(&self, bucket: &str, key: &str) -> String {
        format!("s3://{bucket}/{key}")
    }

    /// Reads a JSON-lines object; blank lines are skipped.
    fn read_records(&self, bucket: &str, key: &str) -> Result<Vec<Value>, StorageError> {
        parse_records(&self.read_text(bucket, key)?)
    }

    /// Writes records as JSON lines, one object per line.
    fn write_records(
        &self,
        bucket: &str,
        key: &str,
        records: &[Value],
    ) -> Result<WriteReceipt, StorageError> {
        self.write_text(bucket, key, &render_records(records)?)
    }
}

/// Parses JSON-lines text.
pub fn parse_records(text: &str) -> Result<Vec<Value>, StorageError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .map_err(|source| StorageError::InvalidRecord { line: idx + 1, source })
        })
        .collect()
}

/// Renders records as JSON-lines text with a trailing newline per record.
pub fn render_records<T: Serialize>(records: &[T]) -> Result<String, StorageError> {
    let mut out = String::new();
    for (idx, record) in records.iter().enumerate() {
        let line = serde_json::to_string(record)
            .map_err(|source| StorageError::InvalidRecord { line: idx + 1, source })?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Reads a JSON-lines object into typed records.
pub fn read_records_as<T: DeserializeOwned>(
    storage: &dyn Storage,
    bucket: &str,
    key: &str,
) -> Result<Vec<T>, StorageError> {
    storage
        .read_records(bucket, key)?
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            serde_json::from_value(value)
                .map_err(|source| StorageError::InvalidRecord { line: idx + 1, source })
        })
        .collect()
}

/// Writes typed records as a JSON-lines object.
pub fn write_records_from<T: Serialize>(
    storage: &dyn Storage,
    bucket: &str,
    key: &str,
    records: &[T],
) -> Result<WriteReceipt, StorageError> {
    storage.write_text(bucket, key, &render_records(records)?)
}

/// Builds the storage backend selected by the configuration.
#[must_use]
pub fn storage_from_config(config: &SdkConfig) -> Arc<dyn Storage> {
    match config.storage_backend {
        StorageBackend::S3 => Arc::new(ObjectStoreStorage::from_config(config)),
        StorageBackend::Local => Arc::new(LocalFsStorage::new(&config.local_root)),
    }
}
