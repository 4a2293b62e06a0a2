//! Azure Blob Storage object-store backend.
//!
//! Persists gateway state in an Azure Blob container via the Blob REST API
//! using `reqwest`.
//!
//! Key mapping: `{prefix}{key}` -- an optional root prefix namespaces the
//! gateway's keys inside a shared upstream container; listings strip it
//! again.
//!
//! Bulk deletes use the Blob Batch API (`comp=batch`), which caps each
//! batch at 256 sub-requests; chunks are submitted concurrently up to the
//! caller's bound.
//!
//! Credentials are resolved via:
//!   - `AZURE_STORAGE_KEY` environment variable (Shared Key auth)
//!   - `AZURE_STORAGE_CONNECTION_STRING` environment variable
//!   - `AZURE_STORAGE_SAS_TOKEN` environment variable (SAS token auth)

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use sha2::Sha256;
use tracing::{debug, info, warn};

use super::store::{chunk_keys, content_type_for_key, KeyStream, ObjectStore, StoreFuture};
use crate::errors::{generate_request_id, StorageError};

/// Azure REST API version used for all requests.
const AZURE_API_VERSION: &str = "2023-11-03";

/// Maximum sub-requests per Blob Batch call (the provider maximum).
const DELETE_BATCH_SIZE: usize = 256;

/// Percent-encoding set for blob paths: encode everything except
/// unreserved characters and '/' (Azure expects '/' unencoded in paths).
const AZURE_BLOB_ENCODE_SET: percent_encoding::AsciiSet = percent_encoding::NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Azure authentication method.
enum AzureAuth {
    /// Shared Key authentication using the storage account key.
    SharedKey { key_bytes: Vec<u8> },
    /// SAS token authentication (appended as query parameters).
    SasToken { token: String },
}

/// Object store backed by an Azure Blob container.
pub struct AzureObjectStore {
    /// HTTP client for Azure Blob REST API calls.
    client: reqwest::Client,
    /// The backing container name.
    container: String,
    /// Azure storage account name.
    account: String,
    /// Root key prefix inside the container (may be empty).
    prefix: String,
    /// The base URL for the Azure Blob service endpoint.
    base_url: String,
    /// Authentication method.
    auth: AzureAuth,
}

impl AzureObjectStore {
    /// Create a new Azure object store.
    ///
    /// Initializes the reqwest HTTP client and resolves credentials from
    /// environment variables.
    pub async fn new(container: String, account: String, prefix: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        let base_url = format!("https://{}.blob.core.windows.net", account);

        let auth = Self::resolve_auth()?;

        info!(
            "Azure object store initialized: container={} account={} prefix='{}'",
            container, account, prefix
        );

        Ok(Self {
            client,
            container,
            account,
            prefix,
            base_url,
            auth,
        })
    }

    /// Resolve Azure authentication from environment variables.
    fn resolve_auth() -> anyhow::Result<AzureAuth> {
        // 1. Try AZURE_STORAGE_KEY
        if let Ok(key) = std::env::var("AZURE_STORAGE_KEY") {
            let key_bytes = BASE64_STANDARD.decode(&key).map_err(|e| {
                anyhow::anyhow!("Invalid AZURE_STORAGE_KEY (not valid base64): {}", e)
            })?;
            return Ok(AzureAuth::SharedKey { key_bytes });
        }

        // 2. Try AZURE_STORAGE_CONNECTION_STRING (extract AccountKey)
        if let Ok(conn_str) = std::env::var("AZURE_STORAGE_CONNECTION_STRING") {
            for part in conn_str.split(';') {
                if let Some(key_val) = part.strip_prefix("AccountKey=") {
                    let key_bytes = BASE64_STANDARD.decode(key_val).map_err(|e| {
                        anyhow::anyhow!("Invalid AccountKey in connection string: {}", e)
                    })?;
                    return Ok(AzureAuth::SharedKey { key_bytes });
                }
            }
        }

        // 3. Try AZURE_STORAGE_SAS_TOKEN
        if let Ok(sas) = std::env::var("AZURE_STORAGE_SAS_TOKEN") {
            let token = sas.strip_prefix('?').unwrap_or(&sas).to_string();
            return Ok(AzureAuth::SasToken { token });
        }

        Err(anyhow::anyhow!(
            "No Azure credentials found. Set AZURE_STORAGE_KEY, \
             AZURE_STORAGE_CONNECTION_STRING, or AZURE_STORAGE_SAS_TOKEN."
        ))
    }

    /// Map a logical key to an upstream blob name.
    fn blob_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Build the full URL for a blob operation.
    fn blob_url(&self, blob_name: &str) -> String {
        let encoded_blob =
            percent_encoding::utf8_percent_encode(blob_name, &AZURE_BLOB_ENCODE_SET).to_string();
        format!("{}/{}/{}", self.base_url, self.container, encoded_blob)
    }

    /// Get the current UTC date in RFC 1123 format for Azure headers.
    fn rfc1123_date() -> String {
        httpdate::fmt_http_date(std::time::SystemTime::now())
    }

    /// Append SAS token to a URL if using SAS auth.
    fn maybe_append_sas(&self, url: &str) -> String {
        match &self.auth {
            AzureAuth::SasToken { token } => {
                if url.contains('?') {
                    format!("{}&{}", url, token)
                } else {
                    format!("{}?{}", url, token)
                }
            }
            AzureAuth::SharedKey { .. } => url.to_string(),
        }
    }

    /// Classify an Azure HTTP failure.
    fn map_azure_error(context: &str, key: &str, status: StatusCode, body: &str) -> StorageError {
        match status {
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => StorageError::PermissionDenied {
                message: format!("Azure {context}: HTTP {status}"),
            },
            StatusCode::NOT_FOUND => StorageError::NotFound {
                key: key.to_string(),
            },
            _ => StorageError::io(format!("Azure {context}"), format!("HTTP {status} - {body}")),
        }
    }

    /// Sign a blob-level request using Shared Key authentication and
    /// return the Authorization header value.
    ///
    /// The string-to-sign layout (blank lines are unused standard headers):
    /// ```text
    /// VERB\n \n \n Content-Length\n \n Content-Type\n \n \n \n \n \n \n
    /// CanonicalizedHeaders\n CanonicalizedResource
    /// ```
    fn sign_request(
        &self,
        method: &str,
        blob_name: &str,
        content_length: Option<usize>,
        content_type: &str,
        date: &str,
        extra_headers: &[(String, String)],
        query_params: &[(String, String)],
    ) -> Result<String, StorageError> {
        let resource = format!("/{}/{}/{}", self.account, self.container, blob_name);
        self.sign_resource(
            method,
            &resource,
            content_length,
            content_type,
            date,
            extra_headers,
            query_params,
        )
    }

    /// Sign a container-level request (List Blobs, Blob Batch).
    fn sign_request_container(
        &self,
        method: &str,
        content_length: Option<usize>,
        content_type: &str,
        date: &str,
        query_params: &[(String, String)],
    ) -> Result<String, StorageError> {
        let resource = format!("/{}/{}", self.account, self.container);
        self.sign_resource(
            method,
            &resource,
            content_length,
            content_type,
            date,
            &[],
            query_params,
        )
    }

    /// Shared Key signing over a canonicalized resource.
    fn sign_resource(
        &self,
        method: &str,
        canonical_resource_base: &str,
        content_length: Option<usize>,
        content_type: &str,
        date: &str,
        extra_headers: &[(String, String)],
        query_params: &[(String, String)],
    ) -> Result<String, StorageError> {
        let key_bytes = match &self.auth {
            AzureAuth::SharedKey { key_bytes } => key_bytes,
            AzureAuth::SasToken { .. } => {
                return Err(StorageError::PermissionDenied {
                    message: "Cannot sign with SAS token auth".to_string(),
                });
            }
        };

        // Content-Length: empty for 0 or if not provided (GET/DELETE/HEAD).
        let content_length_str = match content_length {
            Some(0) | None => String::new(),
            Some(len) => len.to_string(),
        };

        // Canonicalized headers: x-ms-* headers, lowercased and sorted.
        let mut ms_headers: Vec<(String, String)> = vec![
            ("x-ms-date".to_string(), date.to_string()),
            ("x-ms-version".to_string(), AZURE_API_VERSION.to_string()),
        ];
        for (k, v) in extra_headers {
            let lk = k.to_lowercase();
            if lk.starts_with("x-ms-") && lk != "x-ms-date" && lk != "x-ms-version" {
                ms_headers.push((lk, v.clone()));
            }
        }
        ms_headers.sort_by(|a, b| a.0.cmp(&b.0));

        let canonicalized_headers: String = ms_headers
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join("\n");

        // Canonicalized resource uses the un-encoded blob name plus query
        // parameters sorted by key.
        let mut canonicalized_resource = canonical_resource_base.to_string();
        if !query_params.is_empty() {
            let mut sorted_params = query_params.to_vec();
            sorted_params.sort_by(|a, b| a.0.cmp(&b.0));
            for (k, v) in &sorted_params {
                canonicalized_resource.push_str(&format!("\n{}:{}", k.to_lowercase(), v));
            }
        }

        let string_to_sign = format!(
            "{}\n\n\n{}\n\n{}\n\n\n\n\n\n\n{}\n{}",
            method, content_length_str, content_type, canonicalized_headers, canonicalized_resource
        );

        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(key_bytes).map_err(|e| {
            StorageError::PermissionDenied {
                message: format!("HMAC key error: {e}"),
            }
        })?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!("SharedKey {}:{}", self.account, signature))
    }

    // -- Azure Blob REST API operations ---------------------------------------

    /// Upload a blob (Put Blob).
    async fn azure_upload(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let blob_name = self.blob_name(key);
        let url = self.blob_url(&blob_name);
        let date = Self::rfc1123_date();
        let content_type = content_type_for_key(key);

        let extra_headers = vec![
            ("x-ms-blob-type".to_string(), "BlockBlob".to_string()),
            (
                "x-ms-blob-content-type".to_string(),
                content_type.to_string(),
            ),
        ];

        let mut req = self
            .client
            .put(self.maybe_append_sas(&url))
            .header("x-ms-date", &date)
            .header("x-ms-version", AZURE_API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-blob-content-type", content_type)
            .header("Content-Type", content_type)
            .body(data.clone());

        if let AzureAuth::SharedKey { .. } = &self.auth {
            let auth_header = self.sign_request(
                "PUT",
                &blob_name,
                Some(data.len()),
                content_type,
                &date,
                &extra_headers,
                &[],
            )?;
            req = req.header("Authorization", auth_header);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| StorageError::io("Azure upload", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_azure_error("upload", key, status, &body));
        }

        Ok(())
    }

    /// Download a blob (Get Blob); 404 maps to `None`.
    async fn azure_download(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let blob_name = self.blob_name(key);
        let url = self.blob_url(&blob_name);
        let date = Self::rfc1123_date();

        let mut req = self
            .client
            .get(self.maybe_append_sas(&url))
            .header("x-ms-date", &date)
            .header("x-ms-version", AZURE_API_VERSION);

        if let AzureAuth::SharedKey { .. } = &self.auth {
            let auth_header = self.sign_request("GET", &blob_name, None, "", &date, &[], &[])?;
            req = req.header("Authorization", auth_header);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| StorageError::io("Azure download", e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_azure_error("download", key, status, &body));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| StorageError::io("Azure download body", e))?;

        Ok(Some(body))
    }

    /// Delete a blob.  Idempotent (ignores 404).
    async fn azure_delete(&self, key: &str) -> Result<(), StorageError> {
        let blob_name = self.blob_name(key);
        let url = self.blob_url(&blob_name);
        let date = Self::rfc1123_date();

        let mut req = self
            .client
            .delete(self.maybe_append_sas(&url))
            .header("x-ms-date", &date)
            .header("x-ms-version", AZURE_API_VERSION);

        if let AzureAuth::SharedKey { .. } = &self.auth {
            let auth_header = self.sign_request("DELETE", &blob_name, None, "", &date, &[], &[])?;
            req = req.header("Authorization", auth_header);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| StorageError::io("Azure delete", e))?;

        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_azure_error("delete", key, status, &body));
        }

        Ok(())
    }

    /// Fetch one List Blobs page, returning logical keys and the next
    /// marker.
    async fn azure_list_page(
        &self,
        logical_prefix: &str,
        marker: Option<String>,
    ) -> Result<(Vec<String>, Option<String>), StorageError> {
        let full_prefix = self.blob_name(logical_prefix);
        let mut url = format!(
            "{}/{}?restype=container&comp=list&prefix={}",
            self.base_url,
            self.container,
            percent_encoding::utf8_percent_encode(&full_prefix, &AZURE_BLOB_ENCODE_SET)
        );

        let mut query_params = vec![
            ("comp".to_string(), "list".to_string()),
            ("prefix".to_string(), full_prefix.clone()),
            ("restype".to_string(), "container".to_string()),
        ];
        if let Some(ref m) = marker {
            url.push_str(&format!("&marker={}", m));
            query_params.push(("marker".to_string(), m.clone()));
        }

        let date = Self::rfc1123_date();

        let mut req = self
            .client
            .get(self.maybe_append_sas(&url))
            .header("x-ms-date", &date)
            .header("x-ms-version", AZURE_API_VERSION);

        if let AzureAuth::SharedKey { .. } = &self.auth {
            let auth_header =
                self.sign_request_container("GET", None, "", &date, &query_params)?;
            req = req.header("Authorization", auth_header);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| StorageError::io("Azure list_blobs", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_azure_error(
                "list_blobs",
                logical_prefix,
                status,
                &body,
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| StorageError::io("Azure list_blobs body", e))?;

        // Lightweight XML scraping: extract <Name> inside <Blob> elements
        // and the trailing <NextMarker>, enough for the list schema.
        let next_marker = extract_tag(&body, "NextMarker").filter(|m| !m.is_empty());

        let mut names = Vec::new();
        let mut search_from = 0;
        while let Some(blob_start) = body[search_from..].find("<Blob>") {
            let blob_start = search_from + blob_start;
            let Some(blob_end) = body[blob_start..].find("</Blob>") else {
                break;
            };
            let blob_xml = &body[blob_start..blob_start + blob_end];
            if let Some(name) = extract_tag(blob_xml, "Name") {
                if let Some(logical) = name.strip_prefix(self.prefix.as_str()) {
                    names.push(logical.to_string());
                }
            }
            search_from = blob_start + blob_end;
        }

        Ok((names, next_marker))
    }

    /// Issue one Blob Batch delete call for a chunk of logical keys.
    ///
    /// Each sub-request carries its own authorization under Shared Key;
    /// under SAS auth the sub-request URI carries the token instead.
    async fn delete_batch(&self, chunk: Vec<String>) {
        if let Err(err) = self.try_delete_batch(&chunk).await {
            warn!(
                "Azure delete batch of {} keys failed, skipping: {err}",
                chunk.len()
            );
        }
    }

    async fn try_delete_batch(&self, chunk: &[String]) -> Result<(), StorageError> {
        let date = Self::rfc1123_date();
        let boundary = format!("batch_{}", generate_request_id().to_lowercase());

        let mut body = String::new();
        for (idx, key) in chunk.iter().enumerate() {
            let blob_name = self.blob_name(key);
            let encoded =
                percent_encoding::utf8_percent_encode(&blob_name, &AZURE_BLOB_ENCODE_SET);
            let mut sub_path = format!("/{}/{}", self.container, encoded);
            if let AzureAuth::SasToken { token } = &self.auth {
                sub_path.push('?');
                sub_path.push_str(token);
            }

            body.push_str(&format!("--{boundary}\r\n"));
            body.push_str("Content-Type: application/http\r\n");
            body.push_str("Content-Transfer-Encoding: binary\r\n");
            body.push_str(&format!("Content-ID: {idx}\r\n\r\n"));
            body.push_str(&format!("DELETE {sub_path} HTTP/1.1\r\n"));
            body.push_str(&format!("x-ms-date: {date}\r\n"));
            body.push_str(&format!("x-ms-version: {AZURE_API_VERSION}\r\n"));
            if let AzureAuth::SharedKey { .. } = &self.auth {
                let sub_auth =
                    self.sign_request("DELETE", &blob_name, None, "", &date, &[], &[])?;
                body.push_str(&format!("Authorization: {sub_auth}\r\n"));
            }
            body.push_str("Content-Length: 0\r\n\r\n");
        }
        body.push_str(&format!("--{boundary}--\r\n"));

        let content_type = format!("multipart/mixed; boundary={boundary}");
        let url = format!(
            "{}/{}?restype=container&comp=batch",
            self.base_url, self.container
        );
        let query_params = vec![
            ("comp".to_string(), "batch".to_string()),
            ("restype".to_string(), "container".to_string()),
        ];

        let body_bytes = body.into_bytes();

        let mut req = self
            .client
            .post(self.maybe_append_sas(&url))
            .header("x-ms-date", &date)
            .header("x-ms-version", AZURE_API_VERSION)
            .header("Content-Type", &content_type)
            .body(body_bytes.clone());

        if let AzureAuth::SharedKey { .. } = &self.auth {
            let auth_header = self.sign_request_container(
                "POST",
                Some(body_bytes.len()),
                &content_type,
                &date,
                &query_params,
            )?;
            req = req.header("Authorization", auth_header);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| StorageError::io("Azure blob batch", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::map_azure_error("blob batch", "<batch>", status, &text));
        }

        // Sub-request outcomes come back as a multipart body; surface any
        // non-2xx sub-status (404 excluded -- deletes stay idempotent).
        let text = resp
            .text()
            .await
            .map_err(|e| StorageError::io("Azure blob batch body", e))?;
        for line in text.lines() {
            if let Some(status) = line.strip_prefix("HTTP/1.1 ") {
                let ok = status.starts_with('2') || status.starts_with("404");
                if !ok {
                    warn!("Azure batch sub-request failed: {}", status.trim());
                }
            }
        }

        Ok(())
    }
}

/// Extract the text of the first `<tag>...</tag>` occurrence.
fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].to_string())
}

impl ObjectStore for AzureObjectStore {
    fn save(&self, key: &str, content: Bytes) -> StoreFuture<'_, Result<String, StorageError>> {
        let key = key.to_string();
        Box::pin(async move {
            let blob_name = self.blob_name(&key);
            debug!(
                "Azure put blob: container={} blob={}",
                self.container, blob_name
            );
            self.azure_upload(&key, content).await?;
            Ok(self.blob_url(&blob_name))
        })
    }

    fn get(&self, key: &str) -> StoreFuture<'_, Result<Option<Bytes>, StorageError>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!(
                "Azure get blob: container={} blob={}",
                self.container,
                self.blob_name(&key)
            );
            self.azure_download(&key).await
        })
    }

    fn delete(&self, key: &str) -> StoreFuture<'_, Result<(), StorageError>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!(
                "Azure delete blob: container={} blob={}",
                self.container,
                self.blob_name(&key)
            );
            self.azure_delete(&key).await
        })
    }

    fn list(&self) -> KeyStream<'_> {
        self.list_prefix("")
    }

    fn list_prefix(&self, prefix: &str) -> KeyStream<'_> {
        let prefix = prefix.to_string();

        // State: None = exhausted; Some(marker) = next page to request.
        type PageState = Option<Option<String>>;
        let initial: PageState = Some(None);

        Box::pin(
            stream::try_unfold(initial, move |state| {
                let prefix = prefix.clone();
                async move {
                    let Some(marker) = state else {
                        return Ok(None);
                    };
                    let (keys, next_marker) = self.azure_list_page(&prefix, marker).await?;
                    let next: PageState = next_marker.map(Some);
                    Ok(Some((keys, next)))
                }
            })
            .map_ok(|page: Vec<String>| {
                stream::iter(page.into_iter().map(Ok::<_, StorageError>))
            })
            .try_flatten(),
        )
    }

    fn delete_many(
        &self,
        keys: Vec<String>,
        concurrency: usize,
    ) -> StoreFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            debug!(
                "Azure delete_many: {} keys in batches of {}",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_name_mapping() {
        let prefix = "stubgate/";
        let key = "__files/abc.bin";
        assert_eq!(format!("{prefix}{key}"), "stubgate/__files/abc.bin");
    }

    #[test]
    fn test_extract_tag() {
        let xml = "<EnumerationResults><Blobs><Blob><Name>mappings/a.json</Name></Blob></Blobs><NextMarker>tok</NextMarker></EnumerationResults>";
        assert_eq!(extract_tag(xml, "Name"), Some("mappings/a.json".to_string()));
        assert_eq!(extract_tag(xml, "NextMarker"), Some("tok".to_string()));
        assert_eq!(extract_tag(xml, "Missing"), None);
    }

    #[test]
    fn test_extract_tag_empty_marker_filtered() {
        let xml = "<EnumerationResults><NextMarker></NextMarker></EnumerationResults>";
        let marker = extract_tag(xml, "NextMarker").filter(|m| !m.is_empty());
        assert_eq!(marker, None);
    }

    #[test]
    fn test_blob_path_encoding_keeps_slashes() {
        let encoded = percent_encoding::utf8_percent_encode(
            "mappings/11111111-1111-1111-1111-111111111111.json",
            &AZURE_BLOB_ENCODE_SET,
        )
        .to_string();
        assert_eq!(
            encoded,
            "mappings/11111111-1111-1111-1111-111111111111.json"
        );

        let spaced =
            percent_encoding::utf8_percent_encode("__files/a b.bin", &AZURE_BLOB_ENCODE_SET)
                .to_string();
        assert_eq!(spaced, "__files/a%20b.bin");
    }
}
