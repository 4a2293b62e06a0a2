//! Stub-serving client surface.
//!
//! Forwards every non-admin request straight to the engine.  No
//! normalization applies here, and storage-layer failures never surface
//! to clients beyond the engine's own degraded responses.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::engine::stub::ServeRequest;
use crate::AppState;

/// Engine-internal header stripped from client responses.
const MATCHED_STUB_ID: &str = "matched-stub-id";

/// Forward a client request to the engine and convert the answer.
pub async fn handle_client(state: &AppState, req: Request<Body>) -> Response {
    let (parts, body) = req.into_parts();

    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("failed to read client request body: {err}");
            return (StatusCode::BAD_REQUEST, "Unreadable request body").into_response();
        }
    };

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let mut headers = BTreeMap::new();
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            headers
                .entry(name.as_str().to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    debug!("forwarding client request: {} {}", parts.method, url);

    let serve_response = state
        .engine
        .serve(ServeRequest::new(parts.method.as_str(), &url, headers, body))
        .await;

    let status =
        StatusCode::from_u16(serve_response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = Response::builder().status(status);
    let mut has_content_type = false;
    if let Some(header_map) = response.headers_mut() {
        for (name, value) in &serve_response.headers {
            if name.eq_ignore_ascii_case(MATCHED_STUB_ID) {
                continue;
            }
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                warn!("dropping unrepresentable response header '{name}'");
                continue;
            };
            if name == axum::http::header::CONTENT_TYPE {
                has_content_type = true;
            }
            header_map.insert(name, value);
        }
        if !has_content_type {
            header_map.insert(
                axum::http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
    }

    match response.body(Body::from(serve_response.body)) {
        Ok(response) => response,
        Err(err) => {
            warn!("failed to build client response: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
