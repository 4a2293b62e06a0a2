//! Cold-start bulk load of persisted stub mappings.
//!
//! Runs once at process initialization, before the gateway starts serving
//! traffic: the engine's client-facing surface assumes a fully populated
//! stub table from the first request.  Per-item fetch and parse failures
//! are logged and skipped; the load never aborts as a whole.

use futures::{StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::mappings::MAPPINGS_PREFIX;
use crate::engine::stub::StubDefinition;
use crate::engine::MockEngine;
use crate::storage::store::{ObjectStore, DEFAULT_GET_CONCURRENCY};

/// Outcome of a bulk load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Stubs inserted into the engine.
    pub loaded: usize,
    /// Keys listed under the mappings prefix.
    pub total: usize,
}

/// Loads every persisted stub mapping into the engine's stub table.
pub struct MappingsLoader {
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
}

impl MappingsLoader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            concurrency: DEFAULT_GET_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// List, fetch, parse, and insert every persisted stub.
    ///
    /// Loaded stubs are inserted non-persistent (see
    /// [`MockEngine::insert_loaded`]).  A listing failure degrades to an
    /// empty load.
    pub async fn load_into(&self, engine: &MockEngine) -> LoadSummary {
        let keys: Vec<String> = match self
            .store
            .list_prefix(MAPPINGS_PREFIX)
            .try_collect()
            .await
        {
            Ok(keys) => keys,
            Err(err) => {
                error!("failed to list stub mappings with prefix '{MAPPINGS_PREFIX}': {err}");
                return LoadSummary {
                    loaded: 0,
                    total: 0,
                };
            }
        };

        if keys.is_empty() {
            info!("no stub mappings found in storage (prefix='{MAPPINGS_PREFIX}')");
            return LoadSummary {
                loaded: 0,
                total: 0,
            };
        }

        let total = keys.len();
        info!("loading {total} stub mappings from storage (prefix='{MAPPINGS_PREFIX}')...");

        let mut loaded = 0;
        let mut fetched = self.store.get_many(keys, self.concurrency);
        while let Some((key, content)) = fetched.next().await {
            // A fetch failure was already logged by get_many and degraded
            // to an absent entry.
            let Some(bytes) = content else { continue };

            match serde_json::from_slice::<StubDefinition>(&bytes) {
                Ok(stub) => match engine.insert_loaded(stub).await {
                    Ok(()) => loaded += 1,
                    Err(err) => error!("skipping stub mapping '{key}': {err}"),
                },
                Err(err) => error!("skipping stub mapping '{key}': {err}"),
            }
        }

        info!("finished loading {loaded}/{total} stub mappings from storage");
        LoadSummary { loaded, total }
    }
}

/// Load seed default mappings from a local directory of stub JSON files.
///
/// Registered as engine defaults so a mappings reset restores them.  Each
/// file failure is logged and skipped.  Returns the number registered.
pub async fn load_seed_mappings(dir: &Path, engine: &MockEngine) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("seed mappings directory '{}' unreadable: {err}", dir.display());
            return 0;
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    paths.sort();

    let mut loaded = 0;
    for path in paths {
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                serde_json::from_str::<StubDefinition>(&text).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(stub) => match engine.register_default(stub).await {
                Ok(()) => loaded += 1,
                Err(err) => error!("skipping seed mapping '{}': {err}", path.display()),
            },
            Err(err) => error!("skipping seed mapping '{}': {err}", path.display()),
        }
    }

    info!("registered {loaded} seed default mapping(s) from {}", dir.display());
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryObjectStore;
    use crate::stores::blob::FileStore;
    use bytes::Bytes;

    fn engine_over(store: Arc<MemoryObjectStore>) -> MockEngine {
        MockEngine::new(Arc::new(FileStore::new(store)))
    }

    async fn seed_mapping(store: &MemoryObjectStore, id: &str, url: &str) {
        let json = format!(
            r#"{{"id":"{id}","request":{{"method":"GET","url":"{url}"}},
                "response":{{"status":200,"body":"ok"}},"persistent":true}}"#
        );
        store
            .save(&format!("mappings/{id}.json"), Bytes::from(json))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_store_loads_nothing() {
        let store = Arc::new(MemoryObjectStore::new());
        let engine = engine_over(store.clone());
        let summary = MappingsLoader::new(store).load_into(&engine).await;
        assert_eq!(summary, LoadSummary { loaded: 0, total: 0 });
        assert_eq!(engine.stub_count().await, 0);
    }

    #[tokio::test]
    async fn test_loads_all_mappings() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_mapping(&store, "11111111-1111-1111-1111-111111111111", "/a").await;
        seed_mapping(&store, "22222222-2222-2222-2222-222222222222", "/b").await;

        let engine = engine_over(store.clone());
        let summary = MappingsLoader::new(store).load_into(&engine).await;
        assert_eq!(summary, LoadSummary { loaded: 2, total: 2 });
        assert_eq!(engine.stub_count().await, 2);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_skipped() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_mapping(&store, "11111111-1111-1111-1111-111111111111", "/a").await;
        seed_mapping(&store, "22222222-2222-2222-2222-222222222222", "/b").await;
        store
            .save("mappings/corrupt.json", Bytes::from_static(b"]]not json"))
            .await
            .unwrap();

        let engine = engine_over(store.clone());
        let summary = MappingsLoader::new(store).load_into(&engine).await;
        assert_eq!(summary, LoadSummary { loaded: 2, total: 3 });
        assert_eq!(engine.stub_count().await, 2);
    }

    #[tokio::test]
    async fn test_loaded_stubs_are_non_persistent() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_mapping(&store, "11111111-1111-1111-1111-111111111111", "/a").await;

        let engine = engine_over(store.clone());
        MappingsLoader::new(store).load_into(&engine).await;

        let stubs = engine.list_stubs().await;
        assert_eq!(stubs.len(), 1);
        assert!(!stubs[0].persistent, "loaded stubs must not re-persist");
    }

    #[tokio::test]
    async fn test_only_mappings_namespace_is_loaded() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_mapping(&store, "11111111-1111-1111-1111-111111111111", "/a").await;
        store
            .save("__files/body.json", Bytes::from_static(b"\"hello\""))
            .await
            .unwrap();

        let engine = engine_over(store.clone());
        let summary = MappingsLoader::new(store).load_into(&engine).await;
        assert_eq!(summary, LoadSummary { loaded: 1, total: 1 });
    }

    #[tokio::test]
    async fn test_seed_mappings_from_directory() {
        let dir = std::env::temp_dir().join(format!("stubgate-seed-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.json"),
            r#"{"request":{"urlPath":"/seeded"},"response":{"status":200}}"#,
        )
        .unwrap();
        std::fs::write(dir.join("broken.json"), "{").unwrap();
        std::fs::write(dir.join("ignored.yaml"), "not json").unwrap();

        let store = Arc::new(MemoryObjectStore::new());
        let engine = engine_over(store);
        let loaded = load_seed_mappings(&dir, &engine).await;
        assert_eq!(loaded, 1);
        assert_eq!(engine.stub_count().await, 1);

        std::fs::remove_dir_all(&dir).ok();
    }
}
