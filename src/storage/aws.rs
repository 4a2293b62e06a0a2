//! AWS S3 object-store backend.
//!
//! Persists gateway state in a real S3 bucket so stub mappings and body
//! files survive stateless function invocations.
//!
//! Key mapping: `{prefix}{key}` -- an optional root prefix namespaces the
//! gateway's keys inside a shared upstream bucket.  Listings strip the
//! prefix again so callers only ever see logical keys.
//!
//! Credentials are resolved via the standard AWS credential chain
//! (env vars, `~/.aws/credentials`, IAM role, etc.) unless explicit keys
//! are configured.

use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use super::store::{chunk_keys, content_type_for_key, KeyStream, ObjectStore, StoreFuture};
use crate::errors::StorageError;

/// S3 listing page size (the provider maximum).
const LIST_PAGE_SIZE: i32 = 1000;

/// Maximum keys per DeleteObjects batch call (the provider maximum).
const DELETE_BATCH_SIZE: usize = 1000;

/// Object store backed by an S3 bucket.
pub struct S3ObjectStore {
    /// AWS S3 SDK client.
    client: Client,
    /// The backing bucket name.
    bucket: String,
    /// Root key prefix inside the bucket (may be empty).
    prefix: String,
}

impl S3ObjectStore {
    /// Create a new S3 object store.
    ///
    /// Loads AWS credentials from the default credential chain unless
    /// explicit keys are provided.  A custom `endpoint_url` plus
    /// `use_path_style` supports S3-compatible stores (MinIO, LocalStack).
    pub async fn new(
        bucket: String,
        region: String,
        prefix: String,
        endpoint_url: Option<String>,
        use_path_style: bool,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region));

        if let Some(ref endpoint) = endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        if let (Some(ref ak), Some(ref sk)) = (&access_key_id, &secret_access_key) {
            let creds = aws_sdk_s3::config::Credentials::new(
                ak,
                sk,
                None, // session_token
                None, // expiry
                "stubgate-config",
            );
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;

        let s3_config_builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(use_path_style);

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            "S3 object store initialized: bucket={} prefix='{}'",
            bucket, prefix
        );

        Ok(Self {
            client,
            bucket,
            prefix,
        })
    }

    /// Map a logical key to an upstream S3 key.
    fn s3_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Classify an SDK error using its service error code.
    fn map_sdk_error(
        context: &str,
        key: &str,
        err: impl ProvideErrorMetadata + std::fmt::Display,
    ) -> StorageError {
        match err.code() {
            Some("AccessDenied") | Some("InvalidAccessKeyId") | Some("SignatureDoesNotMatch") => {
                StorageError::PermissionDenied {
                    message: format!("S3 {context}: {err}"),
                }
            }
            Some("NoSuchBucket") => StorageError::NotFound {
                key: key.to_string(),
            },
            _ => StorageError::io(format!("S3 {context}"), err),
        }
    }

    /// Stream logical keys under `logical_prefix`, paging through
    /// ListObjectsV2 with continuation tokens.
    fn key_pages(&self, logical_prefix: String) -> KeyStream<'_> {
        let full_prefix = self.s3_key(&logical_prefix);
        let root = self.prefix.clone();

        // State: None = exhausted; Some(token) = next page to request.
        type PageState = Option<Option<String>>;
        let initial: PageState = Some(None);

        Box::pin(
            stream::try_unfold(initial, move |state| {
                let full_prefix = full_prefix.clone();
                let root = root.clone();
                async move {
                    let Some(token) = state else {
                        return Ok(None);
                    };

                    let mut req = self
                        .client
                        .list_objects_v2()
                        .bucket(&self.bucket)
                        .prefix(&full_prefix)
                        .max_keys(LIST_PAGE_SIZE);
                    if let Some(ref t) = token {
                        req = req.continuation_token(t);
                    }

                    let resp = req.send().await.map_err(|e| {
                        Self::map_sdk_error("list_objects_v2", &full_prefix, e)
                    })?;

                    let keys: Vec<String> = resp
                        .contents()
                        .iter()
                        .filter_map(|obj| obj.key())
                        .filter_map(|k| k.strip_prefix(root.as_str()))
                        .map(str::to_string)
                        .collect();

                    let next: PageState = if resp.is_truncated() == Some(true) {
                        Some(resp.next_continuation_token().map(|s| s.to_string()))
                    } else {
                        None
                    };

                    Ok(Some((keys, next)))
                }
            })
            .map_ok(|page: Vec<String>| {
                stream::iter(page.into_iter().map(Ok::<_, StorageError>))
            })
            .try_flatten(),
        )
    }

    /// Issue one DeleteObjects call for a chunk of logical keys.
    async fn delete_batch(&self, chunk: Vec<String>) {
        let objects: Vec<aws_sdk_s3::types::ObjectIdentifier> = chunk
            .iter()
            .map(|key| {
                aws_sdk_s3::types::ObjectIdentifier::builder()
                    .key(self.s3_key(key))
                    .build()
                    .expect("ObjectIdentifier requires key")
            })
            .collect();

        let delete = match aws_sdk_s3::types::Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
        {
            Ok(delete) => delete,
            Err(err) => {
                warn!("delete batch of {} keys skipped: {err}", chunk.len());
                return;
            }
        };

        match self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
        {
            Ok(resp) => {
                for err in resp.errors() {
                    warn!(
                        "batch delete failed for '{}': {}",
                        err.key().unwrap_or("<unknown>"),
                        err.message().unwrap_or("<no message>")
                    );
                }
            }
            Err(err) => {
                warn!("delete batch of {} keys failed, skipping: {err}", chunk.len());
            }
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn save(&self, key: &str, content: Bytes) -> StoreFuture<'_, Result<String, StorageError>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);

            debug!("S3 put_object: bucket={} key={}", self.bucket, s3_key);

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .content_type(content_type_for_key(&key))
                .body(aws_sdk_s3::primitives::ByteStream::from(content))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_object", &key, e))?;

            Ok(format!("s3://{}/{}", self.bucket, s3_key))
        })
    }

    fn get(&self, key: &str) -> StoreFuture<'_, Result<Option<Bytes>, StorageError>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);

            debug!("S3 get_object: bucket={} key={}", self.bucket, s3_key);

            let resp = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    let service_err = err.into_service_error();
                    if service_err.is_no_such_key() {
                        return Ok(None);
                    }
                    return Err(Self::map_sdk_error("get_object", &key, service_err));
                }
            };

            let data = resp
                .body
                .collect()
                .await
                .map_err(|e| StorageError::io("S3 get_object body", e))?
                .into_bytes();

            Ok(Some(data))
        })
    }

    fn delete(&self, key: &str) -> StoreFuture<'_, Result<(), StorageError>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);

            debug!("S3 delete_object: bucket={} key={}", self.bucket, s3_key);

            // S3 delete_object is idempotent -- no error for missing keys.
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("delete_object", &key, e))?;

            Ok(())
        })
    }

    fn list(&self) -> KeyStream<'_> {
        self.key_pages(String::new())
    }

    fn list_prefix(&self, prefix: &str) -> KeyStream<'_> {
        self.key_pages(prefix.to_string())
    }

    fn delete_many(
        &self,
        keys: Vec<String>,
        concurrency: usize,
    ) -> StoreFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            debug!(
                "S3 delete_many: {} keys in batches of {}",
                keys.len(),
                DELETE_BATCH_SIZE
            );

            stream::iter(chunk_keys(keys, DELETE_BATCH_SIZE))
                .map(|chunk| self.delete_batch(chunk))
                .buffer_unordered(concurrency.max(1))
                .collect::<()>()
                .await;

            Ok(())
        })
    }
}
