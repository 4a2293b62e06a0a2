//! Inline-body externalization for create/update mapping requests.
//!
//! A persistent stub arriving with an inline `body` or `base64Body` gets
//! that content moved into the file store and replaced by a
//! `bodyFileName` reference, so the stub JSON stays small and the body
//! survives as its own object.  Applying the filter twice is a no-op: a
//! definition that already carries `bodyFileName` passes through
//! untouched, byte for byte.
//!
//! The rewrite works on the raw JSON tree rather than the typed stub
//! model so unknown fields in the payload survive unchanged.

use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AdminError;
use crate::stores::blob::FileStore;

/// Normalize a create/update mapping request body.
///
/// Returns the input unchanged when there is nothing to do:
/// `bodyFileName` already present, the stub is not persistent, or no
/// inline body exists.  Otherwise returns the rewritten JSON after
/// writing the extracted content to `files`.
pub async fn normalize_mapping_body(
    files: &FileStore,
    mapping_json: &str,
) -> Result<String, AdminError> {
    let mut root: Value = serde_json::from_str(mapping_json)
        .map_err(|e| AdminError::invalid(format!("Malformed stub mapping JSON: {e}")))?;
    let Some(obj) = root.as_object_mut() else {
        return Err(AdminError::invalid("Stub mapping must be a JSON object"));
    };

    // Already normalized, or transient content that must never be
    // persisted: pass through untouched.
    let persistent = obj
        .get("persistent")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let already_normalized = obj
        .get("response")
        .and_then(|r| r.get("bodyFileName"))
        .is_some();
    if already_normalized || !persistent {
        return Ok(mapping_json.to_string());
    }

    if !matches!(obj.get("response"), Some(Value::Object(_))) {
        obj.insert("response".to_string(), Value::Object(Map::new()));
    }

    let (body_node, base64_node) = {
        let Some(response) = obj.get_mut("response").and_then(Value::as_object_mut) else {
            return Err(AdminError::Internal(anyhow::anyhow!(
                "response node is not an object"
            )));
        };
        (response.remove("body"), response.remove("base64Body"))
    };

    if body_node.is_none() && base64_node.is_none() {
        return Ok(mapping_json.to_string());
    }

    // The engine and the store must agree on identity, so a generated id
    // is written back into the definition.
    let mapping_id = match obj.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            let generated = Uuid::new_v4().to_string();
            obj.insert("id".to_string(), Value::String(generated.clone()));
            generated
        }
    };

    // Binary wins when both body kinds are present.
    let is_binary = base64_node.is_some();
    let file_name = if is_binary {
        format!("{mapping_id}.bin")
    } else {
        format!("{mapping_id}.json")
    };

    // base64 content is already in stored form; text is stored verbatim.
    // A non-string body node (an inline JSON body) is stored as its
    // compact serialization.
    let content = match if is_binary { &base64_node } else { &body_node } {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    info!("externalizing inline body of stub mapping {mapping_id} to '{file_name}'");
    let locator = files.put_raw(&file_name, &content).await?;
    debug!("stub mapping body stored at {locator}");

    let Some(response) = obj.get_mut("response").and_then(Value::as_object_mut) else {
        return Err(AdminError::Internal(anyhow::anyhow!(
            "response node is not an object"
        )));
    };

    if !matches!(response.get("headers"), Some(Value::Object(_))) {
        response.insert("headers".to_string(), Value::Object(Map::new()));
    }
    if let Some(headers) = response.get_mut("headers").and_then(Value::as_object_mut) {
        // Only a default; an existing Content-Type is never overridden.
        let has_content_type = headers.keys().any(|k| k.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            let default = if is_binary {
                "application/octet-stream"
            } else {
                "application/json"
            };
            headers.insert(
                "Content-Type".to_string(),
                Value::String(default.to_string()),
            );
        }
    }

    response.insert("bodyFileName".to_string(), Value::String(file_name));

    serde_json::to_string(&root)
        .map_err(|e| AdminError::Internal(anyhow::anyhow!("re-serialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryObjectStore;
    use crate::storage::store::ObjectStore;
    use std::sync::Arc;

    fn files() -> (Arc<MemoryObjectStore>, FileStore) {
        let store = Arc::new(MemoryObjectStore::new());
        let files = FileStore::new(store.clone());
        (store, files)
    }

    const TEXT_STUB: &str = r#"{"id":"11111111-1111-1111-1111-111111111111","response":{"status":200,"headers":{"X-Foo":"bar"},"body":"hello"},"persistent":true}"#;

    #[tokio::test]
    async fn test_text_body_is_externalized() {
        let (store, files) = files();
        let out = normalize_mapping_body(&files, TEXT_STUB).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();

        let response = &parsed["response"];
        assert!(response.get("body").is_none());
        assert!(response.get("base64Body").is_none());
        assert_eq!(
            response["bodyFileName"],
            "11111111-1111-1111-1111-111111111111.json"
        );
        assert_eq!(response["headers"]["X-Foo"], "bar");
        assert_eq!(response["headers"]["Content-Type"], "application/json");

        let stored = store
            .get("__files/11111111-1111-1111-1111-111111111111.json")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&stored[..], b"hello");
    }

    #[tokio::test]
    async fn test_binary_body_is_externalized() {
        let (_, files) = files();
        let input = r#"{"id":"22222222-2222-2222-2222-222222222222","response":{"status":200,"base64Body":"aGVsbG8="},"persistent":true}"#;
        let out = normalize_mapping_body(&files, input).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();

        let response = &parsed["response"];
        assert!(response.get("base64Body").is_none());
        assert_eq!(
            response["bodyFileName"],
            "22222222-2222-2222-2222-222222222222.bin"
        );
        assert_eq!(
            response["headers"]["Content-Type"],
            "application/octet-stream"
        );

        // The blob store decodes back to the original bytes.
        let decoded = files
            .get("22222222-2222-2222-2222-222222222222.bin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&decoded[..], b"hello");
    }

    #[tokio::test]
    async fn test_already_normalized_passes_through_byte_identical() {
        let (store, files) = files();
        let input = r#"{"id":"33333333-3333-3333-3333-333333333333","response":{"status":200,"bodyFileName":"existing.json"},"persistent":true}"#;
        let out = normalize_mapping_body(&files, input).await.unwrap();
        assert_eq!(out, input);
        assert!(store.is_empty().await, "no blob store writes may occur");
    }

    #[tokio::test]
    async fn test_transient_mapping_passes_through() {
        let (store, files) = files();
        let input = r#"{"response":{"status":200,"body":"hello"},"persistent":false}"#;
        let out = normalize_mapping_body(&files, input).await.unwrap();
        assert_eq!(out, input);
        assert!(store.is_empty().await);

        // Absent flag means transient too.
        let input = r#"{"response":{"status":200,"body":"hello"}}"#;
        let out = normalize_mapping_body(&files, input).await.unwrap();
        assert_eq!(out, input);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_no_inline_body_passes_through() {
        let (store, files) = files();
        let input = r#"{"id":"44444444-4444-4444-4444-444444444444","response":{"status":204},"persistent":true}"#;
        let out = normalize_mapping_body(&files, input).await.unwrap();
        assert_eq!(out, input);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_normalization_is_idempotent() {
        let (_, files) = files();
        let once = normalize_mapping_body(&files, TEXT_STUB).await.unwrap();
        let twice = normalize_mapping_body(&files, &once).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_missing_id_is_generated_and_written_back() {
        let (_, files) = files();
        let input = r#"{"response":{"body":"hi"},"persistent":true}"#;
        let out = normalize_mapping_body(&files, input).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();

        let id = parsed["id"].as_str().expect("id must be written back");
        let id: Uuid = id.parse().expect("generated id must be a UUID");
        assert_eq!(
            parsed["response"]["bodyFileName"],
            format!("{id}.json")
        );
    }

    #[tokio::test]
    async fn test_existing_content_type_is_preserved() {
        let (_, files) = files();
        let input = r#"{"id":"55555555-5555-5555-5555-555555555555","response":{"body":"<x/>","headers":{"Content-Type":"application/xml"}},"persistent":true}"#;
        let out = normalize_mapping_body(&files, input).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed["response"]["headers"]["Content-Type"],
            "application/xml"
        );
    }

    #[tokio::test]
    async fn test_binary_wins_when_both_bodies_present() {
        let (store, files) = files();
        let input = r#"{"id":"66666666-6666-6666-6666-666666666666","response":{"body":"text","base64Body":"aGVsbG8="},"persistent":true}"#;
        let out = normalize_mapping_body(&files, input).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed["response"]["bodyFileName"],
            "66666666-6666-6666-6666-666666666666.bin"
        );
        // Only the binary content was stored.
        assert_eq!(store.len().await, 1);
        let raw = store
            .get("__files/66666666-6666-6666-6666-666666666666.bin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&raw[..], b"aGVsbG8=");
    }

    #[tokio::test]
    async fn test_structured_json_body_is_serialized_compactly() {
        let (store, files) = files();
        let input = r#"{"id":"77777777-7777-7777-7777-777777777777","response":{"body":{"nested":true}},"persistent":true}"#;
        let out = normalize_mapping_body(&files, input).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed["response"]["bodyFileName"],
            "77777777-7777-7777-7777-777777777777.json"
        );
        let raw = store
            .get("__files/77777777-7777-7777-7777-777777777777.json")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&raw[..], br#"{"nested":true}"#);
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_input() {
        let (_, files) = files();
        let err = normalize_mapping_body(&files, "{not json").await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidInput { .. }));

        let err = normalize_mapping_body(&files, "[1,2]").await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidInput { .. }));
    }
}
