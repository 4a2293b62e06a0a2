//! Axum router construction.
//!
//! The [`app`] function wires the admin surface under `/__admin`, routes
//! everything else to the stub-serving fallback, and returns a
//! ready-to-serve [`axum::Router`].

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderValue, Method, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::generate_request_id;
use crate::handlers;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

/// Build the axum [`Router`].
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    let observability = state.config.observability.clone();

    let mut router = Router::new()
        // Admin surface; the wildcard route receives the sub-path with
        // the prefix already stripped.
        .route("/__admin", any(admin_root))
        .route("/__admin/", any(admin_root))
        .route("/__admin/*path", any(admin_dispatch))
        // Everything else is client traffic served by the engine.
        .fallback(client_dispatch);

    if observability.health_check {
        router = router.route("/health", get(health_check));
    }
    if observability.metrics {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        // Application state shared across all handlers.
        .with_state(state)
        // Layer ordering: the last layer applied is outermost. Layers are
        // applied inner-to-outer here so the resulting order matches the
        // intended outer-to-inner chain: metrics_middleware wraps everything
        // so it captures the full request lifecycle; the admin API is driven
        // from browsers and test tooling alike, hence permissive CORS.
        .layer(middleware::from_fn(common_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(metrics_middleware))
        // Stubbed response bodies can be large.
        .layer(DefaultBodyLimit::disable())
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health` -- liveness probe.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// `/__admin` with no sub-path: not a known admin operation.
async fn admin_root(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Response {
    match handlers::admin::handle_admin(&state, "", &method, body).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

/// `/__admin/*path` -- administrative API dispatch.
async fn admin_dispatch(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    method: Method,
    body: Bytes,
) -> Response {
    match handlers::admin::handle_admin(&state, &path, &method, body).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

/// Fallback -- stub-serving client traffic.
async fn client_dispatch(State(state): State<Arc<AppState>>, req: Request<Body>) -> Response {
    handlers::client::handle_client(&state, req).await
}

// -- Common headers middleware -------------------------------------------------

/// Tower middleware that adds common response headers to every response:
/// `x-request-id`, `Date`, and `Server`.
async fn common_headers_middleware(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    // Only set x-request-id if not already present (the error handler may
    // set it).
    if !headers.contains_key("x-request-id") {
        let request_id = generate_request_id();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert("x-request-id", value);
        }
    }

    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    if let Ok(value) = HeaderValue::from_str(&date) {
        headers.insert("date", value);
    }
    headers.insert("server", HeaderValue::from_static("StubGate"));

    response
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::memory::MemoryObjectStore;
    use crate::storage::store::ObjectStore;
    use crate::stores::loader::MappingsLoader;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<AppState>) {
        let store = Arc::new(MemoryObjectStore::new());
        let state = Arc::new(AppState::new(Config::default(), store));
        (app(state.clone()), state)
    }

    fn request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    const PERSISTENT_STUB: &str = r#"{"id":"11111111-1111-1111-1111-111111111111","request":{"method":"GET","url":"/greet"},"response":{"status":200,"headers":{"X-Foo":"bar"},"body":"hello"},"persistent":true}"#;

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = test_app();
        let resp = app
            .oneshot(request("GET", "/health", ""))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("server").and_then(|v| v.to_str().ok()),
            Some("StubGate")
        );
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_create_then_serve_round_trip() {
        let (app, _) = test_app();

        let resp = app
            .clone()
            .oneshot(request("POST", "/__admin/mappings", PERSISTENT_STUB))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(request("GET", "/greet", ""))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("x-foo").and_then(|v| v.to_str().ok()),
            Some("bar")
        );
        // The engine-internal match marker never reaches clients.
        assert!(resp.headers().get("matched-stub-id").is_none());
        // Normalization set the default Content-Type for the text body.
        assert_eq!(
            resp.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(body_string(resp).await, "hello");
    }

    #[tokio::test]
    async fn test_unmatched_client_request_is_404() {
        let (app, _) = test_app();
        let resp = app
            .oneshot(request("GET", "/nothing-here", ""))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "Request was not matched");
    }

    #[tokio::test]
    async fn test_admin_status_contract() {
        let (app, _) = test_app();

        let resp = app
            .clone()
            .oneshot(request("GET", "/__admin/unknown-op", ""))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .clone()
            .oneshot(request("PATCH", "/__admin/mappings", ""))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let resp = app
            .clone()
            .oneshot(request("POST", "/__admin/mappings", "{broken"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app
            .oneshot(request(
                "GET",
                "/__admin/mappings/99999999-9999-9999-9999-999999999999",
                "",
            ))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cold_start_load_then_serve() {
        let store = Arc::new(MemoryObjectStore::new());
        store
            .save(
                "mappings/11111111-1111-1111-1111-111111111111.json",
                Bytes::from_static(
                    br#"{"id":"11111111-1111-1111-1111-111111111111","request":{"method":"GET","url":"/loaded"},"response":{"status":200,"body":"from storage"},"persistent":true}"#,
                ),
            )
            .await
            .expect("seed");

        let state = Arc::new(AppState::new(Config::default(), store.clone()));
        let summary = MappingsLoader::new(store).load_into(&state.engine).await;
        assert_eq!(summary.loaded, 1);

        let app = app(state);
        let resp = app
            .oneshot(request("GET", "/loaded", ""))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "from storage");
    }

    #[tokio::test]
    async fn test_list_mappings_shape() {
        let (app, _) = test_app();
        app.clone()
            .oneshot(request("POST", "/__admin/mappings", PERSISTENT_STUB))
            .await
            .expect("response");

        let resp = app
            .oneshot(request("GET", "/__admin/mappings", ""))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        let parsed: serde_json::Value =
            serde_json::from_str(&body_string(resp).await).expect("json");
        assert_eq!(parsed["meta"]["total"], 1);
        assert_eq!(
            parsed["mappings"][0]["id"],
            "11111111-1111-1111-1111-111111111111"
        );
    }
}
