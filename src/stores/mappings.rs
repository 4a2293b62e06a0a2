//! Stub definition store over the object store.
//!
//! One object per stub under the `mappings/` prefix, keyed
//! `mappings/<uuid>.json`, value = the stub's canonical JSON.  Reads fall
//! back to the legacy extensionless key for content written by earlier
//! deployments.
//!
//! `add` and `replace` are silent no-ops for non-persistent stubs.  The
//! admin layer filters those too; the adapter keeps its own check so a
//! transient stub can never reach the store through any call path.

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::stub::StubDefinition;
use crate::errors::StorageError;
use crate::metrics::STORAGE_OPERATIONS_TOTAL;
use crate::storage::store::{ObjectStore, DEFAULT_DELETE_CONCURRENCY, DEFAULT_GET_CONCURRENCY};

/// Namespace prefix for persisted stub definitions.
pub const MAPPINGS_PREFIX: &str = "mappings/";

/// Store for persisted stub definitions, namespaced under
/// [`MAPPINGS_PREFIX`].
pub struct StubStore {
    store: Arc<dyn ObjectStore>,
}

impl StubStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Storage key for a stub id.
    fn key_for(id: Uuid) -> String {
        format!("{MAPPINGS_PREFIX}{id}.json")
    }

    /// Legacy storage key (no extension) for content written by earlier
    /// deployments.
    fn legacy_key_for(id: Uuid) -> String {
        format!("{MAPPINGS_PREFIX}{id}")
    }

    fn parse(key: &str, content: &Bytes) -> Option<StubDefinition> {
        match serde_json::from_slice(content) {
            Ok(stub) => Some(stub),
            Err(err) => {
                warn!("skipping unparseable stub mapping '{key}': {err}");
                None
            }
        }
    }

    /// Read a stub by id; `None` when absent or unparseable.
    pub async fn get(&self, id: Uuid) -> Result<Option<StubDefinition>, StorageError> {
        let key = Self::key_for(id);
        let content = match self.store.get(&key).await? {
            Some(content) => Some((key, content)),
            None => {
                let legacy = Self::legacy_key_for(id);
                self.store.get(&legacy).await?.map(|c| (legacy, c))
            }
        };
        Ok(content.and_then(|(key, bytes)| Self::parse(&key, &bytes)))
    }

    /// Read every persisted stub, skipping entries that fail to fetch or
    /// parse.
    pub async fn get_all(&self) -> Result<Vec<StubDefinition>, StorageError> {
        let keys: Vec<String> = self
            .store
            .list_prefix(MAPPINGS_PREFIX)
            .try_collect()
            .await?;

        let fetched: Vec<(String, Option<Bytes>)> = self
            .store
            .get_many(keys, DEFAULT_GET_CONCURRENCY)
            .collect()
            .await;

        Ok(fetched
            .into_iter()
            .filter_map(|(key, content)| {
                content.and_then(|bytes| Self::parse(&key, &bytes))
            })
            .collect())
    }

    /// Persist a stub.  No-op for non-persistent stubs.
    pub async fn add(&self, stub: &StubDefinition) -> Result<(), StorageError> {
        if !stub.persistent {
            debug!("stub {} is transient; not persisting", stub.id);
            return Ok(());
        }
        counter!(STORAGE_OPERATIONS_TOTAL, "operation" => "mapping_save").increment(1);
        let json = serde_json::to_vec(stub)
            .map_err(|e| StorageError::io("serialize stub mapping", e))?;
        let locator = self
            .store
            .save(&Self::key_for(stub.id), Bytes::from(json))
            .await?;
        debug!("persisted stub {} at {locator}", stub.id);
        Ok(())
    }

    /// Persist a replacement.  No-op when the existing stub is not
    /// persistent.
    pub async fn replace(
        &self,
        existing: &StubDefinition,
        updated: &StubDefinition,
    ) -> Result<(), StorageError> {
        if !existing.persistent {
            debug!("stub {} is transient; not persisting update", existing.id);
            return Ok(());
        }
        counter!(STORAGE_OPERATIONS_TOTAL, "operation" => "mapping_save").increment(1);
        let json = serde_json::to_vec(updated)
            .map_err(|e| StorageError::io("serialize stub mapping", e))?;
        self.store
            .save(&Self::key_for(updated.id), Bytes::from(json))
            .await?;
        Ok(())
    }

    /// Delete a stub's persisted form.  Idempotent.
    pub async fn remove(&self, id: Uuid) -> Result<(), StorageError> {
        counter!(STORAGE_OPERATIONS_TOTAL, "operation" => "mapping_delete").increment(1);
        self.store.delete(&Self::key_for(id)).await
    }

    /// Delete every persisted stub.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let keys: Vec<String> = self
            .store
            .list_prefix(MAPPINGS_PREFIX)
            .try_collect()
            .await?;
        if keys.is_empty() {
            return Ok(());
        }
        debug!("clearing {} persisted stub mappings", keys.len());
        self.store
            .delete_many(keys, DEFAULT_DELETE_CONCURRENCY)
            .await
    }
}
