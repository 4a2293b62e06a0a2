//! Response-body file store over the object store.
//!
//! Keys live under the `__files/` prefix.  Text files (e.g. `.json`) are
//! stored verbatim as UTF-8; binaries are base64-encoded because not every
//! backing store guarantees byte-exact round-trips for opaque payloads.
//! On read, non-text keys try a base64 decode and fall back to the raw
//! bytes for content written before the base64 policy existed.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use futures::TryStreamExt;
use metrics::counter;
use std::sync::Arc;
use tracing::debug;

use crate::errors::StorageError;
use crate::metrics::STORAGE_OPERATIONS_TOTAL;
use crate::storage::store::{ObjectStore, DEFAULT_DELETE_CONCURRENCY};

/// Namespace prefix for externalized response bodies.
pub const FILES_PREFIX: &str = "__files/";

/// Key extensions stored as plain text rather than base64.
const TEXT_EXTENSIONS: &[&str] = &[".json", ".txt", ".xml", ".html", ".csv"];

/// Blob store for response body files, namespaced under [`FILES_PREFIX`].
pub struct FileStore {
    store: Arc<dyn ObjectStore>,
}

impl FileStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Qualify a relative file key with the namespace prefix.
    fn full_key(key: &str) -> String {
        if key.starts_with(FILES_PREFIX) {
            key.to_string()
        } else {
            format!("{}{}", FILES_PREFIX, key.trim_start_matches('/'))
        }
    }

    /// Whether the key's extension selects plain-text storage.
    fn is_text_key(key: &str) -> bool {
        let lower = key.to_ascii_lowercase();
        TEXT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }

    /// Read a file's bytes; `None` when absent.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        counter!(STORAGE_OPERATIONS_TOTAL, "operation" => "file_get").increment(1);
        let full = Self::full_key(key);
        let Some(raw) = self.store.get(&full).await? else {
            return Ok(None);
        };

        if Self::is_text_key(key) {
            return Ok(Some(raw));
        }

        match std::str::from_utf8(&raw)
            .ok()
            .and_then(|text| BASE64_STANDARD.decode(text.trim()).ok())
        {
            Some(decoded) => Ok(Some(Bytes::from(decoded))),
            None => {
                // Legacy plain-text content predating the base64 policy.
                debug!("non-base64 content for key={key}; returning raw bytes");
                Ok(Some(raw))
            }
        }
    }

    /// Write a file's bytes under the encoding policy for its extension.
    pub async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        counter!(STORAGE_OPERATIONS_TOTAL, "operation" => "file_put").increment(1);
        let full = Self::full_key(key);
        let content = if Self::is_text_key(key) {
            Bytes::copy_from_slice(value)
        } else {
            Bytes::from(BASE64_STANDARD.encode(value).into_bytes())
        };
        self.store.save(&full, content).await?;
        Ok(())
    }

    /// Write content that is already in its stored form (text verbatim, or
    /// an already-base64-encoded string for a binary key), returning the
    /// store locator.
    pub async fn put_raw(&self, key: &str, content: &str) -> Result<String, StorageError> {
        counter!(STORAGE_OPERATIONS_TOTAL, "operation" => "file_put").increment(1);
        let full = Self::full_key(key);
        self.store
            .save(&full, Bytes::copy_from_slice(content.as_bytes()))
            .await
    }

    /// Delete a file.  Idempotent.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        counter!(STORAGE_OPERATIONS_TOTAL, "operation" => "file_delete").increment(1);
        self.store.delete(&Self::full_key(key)).await
    }

    /// All file keys with the namespace prefix stripped.
    pub async fn all_keys(&self) -> Result<Vec<String>, StorageError> {
        let keys: Vec<String> = self.store.list_prefix(FILES_PREFIX).try_collect().await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(FILES_PREFIX).map(str::to_string))
            .collect())
    }

    /// Delete every file under the namespace.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let keys: Vec<String> = self.store.list_prefix(FILES_PREFIX).try_collect().await?;
        if keys.is_empty() {
            return Ok(());
        }
        debug!("clearing {} response body files", keys.len());
        self.store
            .delete_many(keys, DEFAULT_DELETE_CONCURRENCY)
            .await
    }
}
