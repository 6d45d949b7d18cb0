//! Test doubles for task bodies and storage.

use crate::errors::StorageError;
use crate::storage::{Storage, WriteReceipt};
use md5::{Digest, Md5};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A task body that fails a fixed number of times before succeeding.
///
/// Share it behind an `Arc` and call [`FlakyFn::call`] from a task closure.
#[derive(Debug)]
pub struct FlakyFn {
    failures: Option<usize>,
    message: String,
    calls: AtomicUsize,
}

impl FlakyFn {
    /// Fails the first `failures` calls, then succeeds.
    #[must_use]
    pub fn failing_times(failures: usize) -> Self {
        Self {
            failures: Some(failures),
            message: "transient failure".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails on every call.
    #[must_use]
    pub fn always_failing() -> Self {
        Self {
            failures: None,
            message: "permanent failure".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Overrides the error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Runs one attempt and returns its 1-based number on success.
    pub fn call(&self) -> anyhow::Result<usize> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.failures {
            Some(failures) if attempt > failures => Ok(attempt),
            _ => Err(anyhow::anyhow!("{} (attempt {attempt})", self.message)),
        }
    }

    /// Returns the number of attempts made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<(String, String), String>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object.
    #[must_use]
    pub fn with_object(self, bucket: &str, key: &str, data: &str) -> Self {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), data.to_string());
        self
    }

    /// Returns every object URI, sorted.
    #[must_use]
    pub fn uris(&self) -> Vec<String> {
        self.objects
            .lock()
            .keys()
            .map(|(bucket, key)| self.uri(bucket, key))
            .collect()
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn read_text(&self, bucket: &str, key: &str) -> Result<String, StorageError> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                uri: self.uri(bucket, key),
            })
    }

    fn write_text(&self, bucket: &str, key: &str, data: &str) -> Result<WriteReceipt, StorageError> {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), data.to_string());
        Ok(WriteReceipt {
            etag: hex::encode(Md5::digest(data.as_bytes())),
            bytes: data.len(),
        })
    }

    fn exists(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_flaky_fn_recovers() {
        let flaky = FlakyFn::failing_times(2);
        assert!(flaky.call().is_err());
        assert!(flaky.call().is_err());
        assert_eq!(flaky.call().unwrap(), 3);
        assert_eq!(flaky.call_count(), 3);
    }

    #[test]
    fn test_always_failing() {
        let flaky = FlakyFn::always_failing().with_message("boom");
        let err = flaky.call().unwrap_err();
        assert_eq!(err.to_string(), "boom (attempt 1)");
        assert!(flaky.call().is_err());
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new().with_object("lake", "seed.txt", "seed");
        assert_eq!(storage.read_text("lake", "seed.txt").unwrap(), "seed");

        storage
            .write_records("lake", "out.jsonl", &[json!({"id": 1})])
            .unwrap();
        assert_eq!(storage.read_records("lake", "out.jsonl").unwrap(), vec![json!({"id": 1})]);
        assert_eq!(storage.uris(), vec!["s3://lake/out.jsonl", "s3://lake/seed.txt"]);
        assert!(!storage.exists("lake", "missing"));
        assert!(matches!(
            storage.read_text("lake", "missing"),
            Err(StorageError::NotFound { .. })
        ));
    }
}
