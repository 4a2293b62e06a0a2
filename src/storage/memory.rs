//! In-memory object store.
//!
//! Keys map to byte values inside a `tokio::sync::RwLock<BTreeMap<...>>`.
//! Used by tests and for local development; durability is explicitly not a
//! goal, the production variants delegate that to the cloud provider.

use bytes::Bytes;
use futures::{stream, FutureExt};
use std::collections::BTreeMap;

use super::store::{KeyStream, ObjectStore, StoreFuture};
use crate::errors::StorageError;

/// Object store backed by a sorted in-memory map.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: tokio::sync::RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn save(&self, key: &str, content: Bytes) -> StoreFuture<'_, Result<String, StorageError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.objects.write().await.insert(key.clone(), content);
            Ok(format!("mem://{key}"))
        })
    }

    fn get(&self, key: &str) -> StoreFuture<'_, Result<Option<Bytes>, StorageError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.objects.read().await.get(&key).cloned()) })
    }

    fn delete(&self, key: &str) -> StoreFuture<'_, Result<(), StorageError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.objects.write().await.remove(&key);
            Ok(())
        })
    }

    fn list(&self) -> KeyStream<'_> {
        Box::pin(
            async move {
                let keys: Vec<Result<String, StorageError>> =
                    self.objects.read().await.keys().cloned().map(Ok).collect();
                stream::iter(keys)
            }
            .flatten_stream(),
        )
    }

    fn list_prefix(&self, prefix: &str) -> KeyStream<'_> {
        let prefix = prefix.to_string();
        Box::pin(
            async move {
                let keys: Vec<Result<String, StorageError>> = self
                    .objects
                    .read()
                    .await
                    .range(prefix.clone()..)
                    .take_while(|(k, _)| k.starts_with(&prefix))
                    .map(|(k, _)| Ok(k.clone()))
                    .collect();
                stream::iter(keys)
            }
            .flatten_stream(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, TryStreamExt};

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryObjectStore::new();
        let locator = store
            .save("mappings/a.json", Bytes::from_static(b"{\"x\":1}"))
            .await
            .unwrap();
        assert_eq!(locator, "mem://mappings/a.json");
        let content = store.get("mappings/a.json").await.unwrap();
        assert_eq!(content, Some(Bytes::from_static(b"{\"x\":1}")));
    }

    #[tokio::test]
    async fn test_empty_value_round_trip() {
        let store = MemoryObjectStore::new();
        store.save("__files/empty.bin", Bytes::new()).await.unwrap();
        let content = store.get("__files/empty.bin").await.unwrap();
        assert_eq!(content, Some(Bytes::new()));
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let store = MemoryObjectStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryObjectStore::new();
        store.save("k", Bytes::from_static(b"v")).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let store = MemoryObjectStore::new();
        store.save("k", Bytes::from_static(b"old")).await.unwrap();
        store.save("k", Bytes::from_static(b"new")).await.unwrap();
        assert_eq!(
            store.get("k").await.unwrap(),
            Some(Bytes::from_static(b"new"))
        );
    }

    #[tokio::test]
    async fn test_list_prefix_isolation() {
        let store = MemoryObjectStore::new();
        store
            .save("mappings/1.json", Bytes::from_static(b"a"))
            .await
            .unwrap();
        store
            .save("mappings/2.json", Bytes::from_static(b"b"))
            .await
            .unwrap();
        store
            .save("__files/1.json", Bytes::from_static(b"c"))
            .await
            .unwrap();
        // "mapping" is a partial prefix of "mappings/"; must not leak.
        store
            .save("mapping", Bytes::from_static(b"d"))
            .await
            .unwrap();

        let mapped: Vec<String> = store
            .list_prefix("mappings/")
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            mapped,
            vec!["mappings/1.json".to_string(), "mappings/2.json".to_string()]
        );

        let all: Vec<String> = store.list().try_collect().await.unwrap();
        assert_eq!(all.len(), 4);
        for key in &mapped {
            assert!(all.contains(key));
        }
    }

    #[tokio::test]
    async fn test_delete_many_clears_prefix() {
        let store = MemoryObjectStore::new();
        for i in 0..25 {
            store
                .save(&format!("__files/{i}.bin"), Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        store.save("mappings/keep.json", Bytes::from_static(b"y")).await.unwrap();

        let keys: Vec<String> = store.list_prefix("__files/").try_collect().await.unwrap();
        assert_eq!(keys.len(), 25);
        store.delete_many(keys, 8).await.unwrap();

        let remaining: Vec<String> =
            store.list_prefix("__files/").try_collect().await.unwrap();
        assert!(remaining.is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_many_mixes_present_and_absent() {
        let store = MemoryObjectStore::new();
        store.save("a", Bytes::from_static(b"1")).await.unwrap();
        store.save("b", Bytes::from_static(b"2")).await.unwrap();
        let mut fetched: Vec<(String, Option<Bytes>)> = store
            .get_many(vec!["a".into(), "gone".into(), "b".into()], 2)
            .collect()
            .await;
        fetched.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(fetched[0], ("a".to_string(), Some(Bytes::from_static(b"1"))));
        assert_eq!(fetched[1], ("b".to_string(), Some(Bytes::from_static(b"2"))));
        assert_eq!(fetched[2], ("gone".to_string(), None));
    }
}
