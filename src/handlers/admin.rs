//! Administrative API dispatch.
//!
//! `handle_admin` receives the admin sub-path with the `/__admin` prefix
//! already stripped and dispatches to the engine and storage adapters.
//! Create and update requests pass through the normalization filter
//! before the engine sees them; persistence happens after the engine has
//! accepted the stub.
//!
//! Status contract: 200 success, 201 created, 400 invalid input, 404
//! unknown path or missing resource, 405 method not allowed on a known
//! path.  Storage failures on single-item operations fail the call.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::stub::StubDefinition;
use crate::errors::AdminError;
use crate::normalize::normalize_mapping_body;
use crate::AppState;

/// Dispatch an administrative request.
pub async fn handle_admin(
    state: &AppState,
    path: &str,
    method: &Method,
    body: Bytes,
) -> Result<Response, AdminError> {
    if path == "requests/unmatched/near-misses" {
        if *method != Method::GET {
            return Err(AdminError::MethodNotAllowed);
        }
        info!("retrieving near misses for unmatched requests");
        let near_misses = state.engine.near_misses_for_unmatched().await;
        return json_response(StatusCode::OK, &json!({ "nearMisses": near_misses }));
    }

    if path == "requests/unmatched" {
        if *method != Method::GET {
            return Err(AdminError::MethodNotAllowed);
        }
        info!("retrieving unmatched requests");
        let requests = state.engine.unmatched_requests().await;
        return json_response(
            StatusCode::OK,
            &json!({ "requests": requests, "meta": { "total": requests.len() } }),
        );
    }

    if path == "requests" {
        return match method.as_str() {
            "GET" => {
                info!("retrieving request journal");
                let requests = state.engine.all_requests().await;
                json_response(
                    StatusCode::OK,
                    &json!({ "requests": requests, "meta": { "total": requests.len() } }),
                )
            }
            "DELETE" => {
                info!("clearing request journal");
                state.engine.reset_requests().await;
                Ok(plain_response(StatusCode::OK, "Requests reset successfully"))
            }
            _ => Err(AdminError::MethodNotAllowed),
        };
    }

    if path == "mappings/reset" {
        if *method != Method::POST {
            return Err(AdminError::MethodNotAllowed);
        }
        return reset_mappings(state).await;
    }

    if path == "mappings" {
        return match method.as_str() {
            "GET" => {
                info!("retrieving all stub mappings");
                let mappings = state.engine.list_stubs().await;
                json_response(
                    StatusCode::OK,
                    &json!({ "mappings": mappings, "meta": { "total": mappings.len() } }),
                )
            }
            "POST" => create_mapping(state, &body).await,
            "DELETE" => delete_all_mappings_and_files(state).await,
            _ => Err(AdminError::MethodNotAllowed),
        };
    }

    if path == "files" {
        return match method.as_str() {
            "GET" => {
                let keys = state.files.all_keys().await?;
                json_response(StatusCode::OK, &keys)
            }
            "DELETE" => {
                info!("deleting all response body files");
                state.files.clear().await?;
                Ok(plain_response(StatusCode::OK, "Files deleted successfully"))
            }
            _ => Err(AdminError::MethodNotAllowed),
        };
    }

    if let Some(file_key) = path.strip_prefix("files/") {
        if *method != Method::DELETE {
            return Err(AdminError::MethodNotAllowed);
        }
        info!("deleting response body file '{file_key}'");
        state.files.remove(file_key).await?;
        return Ok(plain_response(StatusCode::OK, "File deleted successfully"));
    }

    if let Some(id_str) = path.strip_prefix("mappings/") {
        let id: Uuid = id_str
            .parse()
            .map_err(|_| AdminError::invalid(format!("Invalid stub mapping id: {id_str}")))?;
        return match method.as_str() {
            "GET" => get_mapping(state, id).await,
            "PUT" => update_mapping(state, id, &body).await,
            "DELETE" => delete_mapping(state, id).await,
            _ => Err(AdminError::MethodNotAllowed),
        };
    }

    warn!("unknown admin request: {path}");
    Err(AdminError::UnknownPath {
        path: path.to_string(),
    })
}

// ── Mapping operations ─────────────────────────────────────────────

async fn create_mapping(state: &AppState, body: &Bytes) -> Result<Response, AdminError> {
    info!("creating new stub mapping");
    let stub = normalize_and_parse(state, body).await?;
    state.engine.add_stub(stub.clone()).await?;
    // Persist after the engine has accepted the stub; the adapter skips
    // non-persistent stubs on its own.
    state.mappings.add(&stub).await?;
    json_response(StatusCode::CREATED, &stub)
}

async fn get_mapping(state: &AppState, id: Uuid) -> Result<Response, AdminError> {
    info!("retrieving stub mapping {id}");
    match state.engine.get_stub(id).await {
        Some(stub) => json_response(StatusCode::OK, &stub),
        None => Err(AdminError::NotFound {
            message: format!("Stub mapping not found: {id}"),
        }),
    }
}

async fn update_mapping(state: &AppState, id: Uuid, body: &Bytes) -> Result<Response, AdminError> {
    info!("updating stub mapping {id}");
    let mut stub = normalize_and_parse(state, body).await?;
    // The path id is authoritative so the engine and storage agree on
    // identity regardless of the payload.
    stub.id = id;

    let existing = state.engine.get_stub(id).await.ok_or_else(|| AdminError::NotFound {
        message: format!("Stub mapping not found: {id}"),
    })?;

    state.engine.edit_stub(stub.clone()).await?;
    state.mappings.replace(&existing, &stub).await?;
    json_response(StatusCode::OK, &stub)
}

async fn delete_mapping(state: &AppState, id: Uuid) -> Result<Response, AdminError> {
    info!("deleting stub mapping {id}");
    state.engine.remove_stub(id).await;
    // No file cascade here: a body file may be shared between stubs.
    state.mappings.remove(id).await?;
    Ok(plain_response(
        StatusCode::OK,
        "Stub mapping deleted successfully",
    ))
}

/// POST `mappings/reset`: restore the seed defaults and drop every stored
/// object -- the one bulk operation where file cleanup cascades.
async fn reset_mappings(state: &AppState) -> Result<Response, AdminError> {
    info!("resetting stub mappings to defaults");
    state.engine.reset_mappings().await;
    state.engine.reset_requests().await;

    let keys: Vec<String> = state
        .store
        .list()
        .try_collect()
        .await
        .map_err(AdminError::from)?;
    state
        .store
        .delete_many(keys, state.config.engine.delete_concurrency)
        .await?;

    Ok(plain_response(StatusCode::OK, "Mappings reset successfully"))
}

/// DELETE `mappings`: clear the stub table, persisted mappings, and all
/// response body files.
async fn delete_all_mappings_and_files(state: &AppState) -> Result<Response, AdminError> {
    info!("deleting all stub mappings and files");
    state.engine.clear_stubs().await;
    state.mappings.clear().await?;
    state.files.clear().await?;
    Ok(plain_response(
        StatusCode::OK,
        "Mappings and files deleted successfully",
    ))
}

// ── Helpers ────────────────────────────────────────────────────────

async fn normalize_and_parse(
    state: &AppState,
    body: &Bytes,
) -> Result<StubDefinition, AdminError> {
    let body_str = std::str::from_utf8(body)
        .map_err(|e| AdminError::invalid(format!("Request body is not valid UTF-8: {e}")))?;

    let normalized = normalize_mapping_body(&state.files, body_str).await?;

    serde_json::from_str(&normalized)
        .map_err(|e| AdminError::invalid(format!("Malformed stub mapping JSON: {e}")))
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response, AdminError> {
    let body = serde_json::to_string(value)
        .map_err(|e| AdminError::Internal(anyhow::anyhow!("response serialization failed: {e}")))?;
    Ok((
        status,
        [("content-type", "application/json")],
        body,
    )
        .into_response())
}

fn plain_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [("content-type", "text/plain; charset=utf-8")],
        message.to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::MockEngine;
    use crate::storage::memory::MemoryObjectStore;
    use crate::stores::blob::FileStore;
    use crate::stores::mappings::StubStore;
    use std::sync::Arc;

    fn app_state() -> (AppState, Arc<MemoryObjectStore>) {
        let store: Arc<MemoryObjectStore> = Arc::new(MemoryObjectStore::new());
        let files = Arc::new(FileStore::new(store.clone()));
        let state = AppState {
            config: Config::default(),
            store: store.clone(),
            files: files.clone(),
            mappings: Arc::new(StubStore::new(store.clone())),
            engine: Arc::new(MockEngine::new(files)),
        };
        (state, store)
    }

    async fn call(
        state: &AppState,
        path: &str,
        method: Method,
        body: &str,
    ) -> Result<Response, AdminError> {
        handle_admin(state, path, &method, Bytes::copy_from_slice(body.as_bytes())).await
    }

    const PERSISTENT_STUB: &str = r#"{"id":"11111111-1111-1111-1111-111111111111","request":{"method":"GET","url":"/greet"},"response":{"status":200,"body":"hello"},"persistent":true}"#;

    #[tokio::test]
    async fn test_create_mapping_persists_and_externalizes() {
        let (state, _) = app_state();
        let resp = call(&state, "mappings", Method::POST, PERSISTENT_STUB)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        // Engine holds the stub.
        assert_eq!(state.engine.stub_count().await, 1);

        // Storage holds the normalized mapping and the externalized body.
        let mapping = state
            .store
            .get("mappings/11111111-1111-1111-1111-111111111111.json")
            .await
            .unwrap()
            .expect("mapping must be persisted");
        let parsed: serde_json::Value = serde_json::from_slice(&mapping).unwrap();
        assert_eq!(
            parsed["response"]["bodyFileName"],
            "11111111-1111-1111-1111-111111111111.json"
        );
        assert!(parsed["response"].get("body").is_none());

        let body_file = state
            .store
            .get("__files/11111111-1111-1111-1111-111111111111.json")
            .await
            .unwrap()
            .expect("body file must be stored");
        assert_eq!(&body_file[..], b"hello");
    }

    #[tokio::test]
    async fn test_create_transient_mapping_is_not_persisted() {
        let (state, mem) = app_state();
        let transient = r#"{"request":{"method":"GET","url":"/t"},"response":{"body":"x"}}"#;
        let resp = call(&state, "mappings", Method::POST, transient)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(state.engine.stub_count().await, 1);
        assert!(mem.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_malformed_mapping_is_bad_request() {
        let (state, _) = app_state();
        let err = call(&state, "mappings", Method::POST, "{broken")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_update_delete_mapping_by_id() {
        let (state, _) = app_state();
        call(&state, "mappings", Method::POST, PERSISTENT_STUB)
            .await
            .unwrap();
        let id = "11111111-1111-1111-1111-111111111111";

        let resp = call(&state, &format!("mappings/{id}"), Method::GET, "")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let updated = r#"{"id":"11111111-1111-1111-1111-111111111111","request":{"method":"GET","url":"/greet"},"response":{"status":200,"body":"updated"},"persistent":true}"#;
        let resp = call(&state, &format!("mappings/{id}"), Method::PUT, updated)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = call(&state, &format!("mappings/{id}"), Method::DELETE, "")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.engine.stub_count().await, 0);
        assert!(state
            .store
            .get(&format!("mappings/{id}.json"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_get_missing_mapping_is_not_found() {
        let (state, _) = app_state();
        let err = call(
            &state,
            "mappings/99999999-9999-9999-9999-999999999999",
            Method::GET,
            "",
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_missing_mapping_is_not_found() {
        let (state, _) = app_state();
        let err = call(
            &state,
            "mappings/99999999-9999-9999-9999-999999999999",
            Method::PUT,
            PERSISTENT_STUB,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_mapping_id_is_bad_request() {
        let (state, _) = app_state();
        let err = call(&state, "mappings/not-a-uuid", Method::GET, "")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (state, _) = app_state();
        let err = call(&state, "scenarios", Method::GET, "").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unsupported_method_on_known_path() {
        let (state, _) = app_state();
        let err = call(&state, "mappings", Method::PATCH, "").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let err = call(&state, "requests", Method::POST, "").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let err = call(&state, "files", Method::PUT, "").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_files_listing_and_deletion() {
        let (state, _) = app_state();
        state.files.put("a.json", b"1").await.unwrap();
        state.files.put("b.bin", b"2").await.unwrap();

        let resp = call(&state, "files", Method::GET, "").await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        call(&state, "files/a.json", Method::DELETE, "")
            .await
            .unwrap();
        let keys = state.files.all_keys().await.unwrap();
        assert_eq!(keys, vec!["b.bin".to_string()]);

        call(&state, "files", Method::DELETE, "").await.unwrap();
        assert!(state.files.all_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_mappings_and_files() {
        let (state, mem) = app_state();
        call(&state, "mappings", Method::POST, PERSISTENT_STUB)
            .await
            .unwrap();

        let resp = call(&state, "mappings", Method::DELETE, "").await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.engine.stub_count().await, 0);
        assert!(mem.is_empty().await);
    }

    #[tokio::test]
    async fn test_reset_mappings_restores_defaults_and_clears_storage() {
        let (state, mem) = app_state();
        state
            .engine
            .register_default(
                serde_json::from_str(
                    r#"{"request":{"urlPath":"/default"},"response":{"status":200}}"#,
                )
                .unwrap(),
            )
            .await
            .unwrap();
        call(&state, "mappings", Method::POST, PERSISTENT_STUB)
            .await
            .unwrap();
        assert_eq!(state.engine.stub_count().await, 2);

        let resp = call(&state, "mappings/reset", Method::POST, "")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.engine.stub_count().await, 1);
        assert!(mem.is_empty().await);
    }

    #[tokio::test]
    async fn test_journal_endpoints() {
        let (state, _) = app_state();
        state
            .engine
            .serve(crate::engine::stub::ServeRequest::new(
                "GET",
                "/nowhere",
                Default::default(),
                Bytes::new(),
            ))
            .await;

        let resp = call(&state, "requests", Method::GET, "").await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = call(&state, "requests/unmatched", Method::GET, "")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = call(&state, "requests/unmatched/near-misses", Method::GET, "")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        call(&state, "requests", Method::DELETE, "").await.unwrap();
        assert!(state.engine.all_requests().await.is_empty());
    }
}
