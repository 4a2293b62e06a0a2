//! Abstract object-store trait.
//!
//! Every storage backend must implement [`ObjectStore`].  The trait works
//! in terms of opaque byte values and lazy key streams so callers do not
//! need to know the underlying provider or its page sizes.
//!
//! Bulk operations (`get_many`, `delete_many`) fan out with bounded
//! concurrency: cloud object-store APIs rate-limit per-connection
//! throughput, so unbounded fan-out risks throttling.  Backends with a
//! native batch-delete API override `delete_many` to chunk into
//! provider-sized batches.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::future::Future;
use std::pin::Pin;
use tracing::warn;

use crate::errors::StorageError;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lazy stream of object keys, restartable per call.
pub type KeyStream<'a> = Pin<Box<dyn Stream<Item = Result<String, StorageError>> + Send + 'a>>;

/// Stream of `(key, content)` pairs produced by a bulk get; `None` marks
/// an absent key or a per-key failure degraded to absent.
pub type FetchStream<'a> = Pin<Box<dyn Stream<Item = (String, Option<Bytes>)> + Send + 'a>>;

/// Default in-flight bound for bulk gets.
pub const DEFAULT_GET_CONCURRENCY: usize = 32;

/// Default in-flight bound for bulk deletes.
pub const DEFAULT_DELETE_CONCURRENCY: usize = 8;

/// Infer a content type from the key suffix.
///
/// Stub mapping JSON and text body files get a text content type so the
/// stored objects stay inspectable in the provider console; everything
/// else is an opaque blob.
pub fn content_type_for_key(key: &str) -> &'static str {
    let lower = key.to_ascii_lowercase();
    if lower.ends_with(".json") {
        "application/json; charset=utf-8"
    } else if lower.ends_with(".txt") {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

/// Split `keys` into chunks of at most `size` for provider batch calls.
pub fn chunk_keys(keys: Vec<String>, size: usize) -> Vec<Vec<String>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(keys.len().div_ceil(size));
    let mut buf = Vec::with_capacity(size.min(keys.len()));
    for key in keys {
        buf.push(key);
        if buf.len() >= size {
            chunks.push(std::mem::replace(&mut buf, Vec::with_capacity(size)));
        }
    }
    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}

/// Async provider-agnostic object storage contract.
pub trait ObjectStore: Send + Sync + 'static {
    /// Write (or overwrite) `content` at `key`, returning an opaque
    /// locator string (a URI) for diagnostics.
    fn save(&self, key: &str, content: Bytes) -> StoreFuture<'_, Result<String, StorageError>>;

    /// Read the object at `key`.  Absent keys are `Ok(None)`, never an
    /// error.
    fn get(&self, key: &str) -> StoreFuture<'_, Result<Option<Bytes>, StorageError>>;

    /// Delete the object at `key`.  Idempotent: deleting an absent key
    /// succeeds.
    fn delete(&self, key: &str) -> StoreFuture<'_, Result<(), StorageError>>;

    /// Stream every key in the store, transparently paging through
    /// provider page limits.
    fn list(&self) -> KeyStream<'_>;

    /// Stream keys starting with `prefix`.
    ///
    /// The default filters [`ObjectStore::list`] client-side; backends
    /// with server-side prefix filtering override this.
    fn list_prefix(&self, prefix: &str) -> KeyStream<'_> {
        let prefix = prefix.to_string();
        Box::pin(
            self.list()
                .try_filter(move |key| futures::future::ready(key.starts_with(&prefix))),
        )
    }

    /// Fetch a batch of keys with at most `concurrency` requests in
    /// flight.  A per-key failure degrades to `None` for that key and is
    /// logged; it never aborts the batch.
    fn get_many(&self, keys: Vec<String>, concurrency: usize) -> FetchStream<'_> {
        Box::pin(
            stream::iter(keys)
                .map(move |key| async move {
                    match self.get(&key).await {
                        Ok(content) => (key, content),
                        Err(err) => {
                            warn!("bulk get of '{key}' failed, treating as absent: {err}");
                            (key, None)
                        }
                    }
                })
                .buffer_unordered(concurrency.max(1)),
        )
    }

    /// Delete a batch of keys with at most `concurrency` operations in
    /// flight.  Per-key failures are logged and skipped, never fatal to
    /// the batch.
    ///
    /// The default issues single-key deletes; backends with a batch API
    /// override this to chunk into provider-sized batch calls.
    fn delete_many(
        &self,
        keys: Vec<String>,
        concurrency: usize,
    ) -> StoreFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            stream::iter(keys)
                .map(move |key| async move {
                    if let Err(err) = self.delete(&key).await {
                        warn!("bulk delete of '{key}' failed, skipping: {err}");
                    }
                })
                .buffer_unordered(concurrency.max(1))
                .collect::<()>()
                .await;
            Ok(())
        })
    }
}
