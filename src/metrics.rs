//! Prometheus metrics for StubGate.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides a Tower-compatible middleware for
//! HTTP RED metrics, and exposes the `/metrics` endpoint handler.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, path, status.
pub const HTTP_REQUESTS_TOTAL: &str = "stubgate_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, path.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "stubgate_http_request_duration_seconds";

/// Total storage operations (counter). Labels: operation, status.
pub const STORAGE_OPERATIONS_TOTAL: &str = "stubgate_storage_operations_total";

/// Total stub mappings loaded at cold start (counter).
pub const MAPPINGS_LOADED_TOTAL: &str = "stubgate_mappings_loaded_total";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent -- safe to
/// call multiple times (e.g. in tests). Returns the global handle.
pub fn init_metrics() -> &'static PrometheusHandle {
    PROMETHEUS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    })
}

/// Register metric descriptions with the global recorder. Call once after
/// `init_metrics()`.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(STORAGE_OPERATIONS_TOTAL, "Total storage operations by type");
    describe_counter!(
        MAPPINGS_LOADED_TOTAL,
        "Stub mappings loaded from storage at cold start"
    );
}

/// Record the cold-start load outcome.
pub fn record_mappings_loaded(loaded: usize) {
    counter!(MAPPINGS_LOADED_TOTAL).increment(loaded as u64);
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes `/metrics` from self-instrumentation to avoid feedback loops.
/// Must be the outermost layer so it captures the full request lifecycle.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    // Do not instrument the metrics endpoint itself.
    if req.uri().path() == "/metrics" {
        return next.run(req).await;
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

// -- Path normalization -------------------------------------------------------

/// Normalize an actual request path to a route template for metric labels.
///
/// This prevents high-cardinality labels from per-stub ids and arbitrary
/// client paths.
///
/// Examples:
/// - `/health` -> `/health`
/// - `/__admin/mappings` -> `/__admin/mappings`
/// - `/__admin/mappings/<uuid>` -> `/__admin/mappings/{id}`
/// - `/__admin/files/a/b.json` -> `/__admin/files/{key}`
/// - `/any/client/path` -> `/{client}`
fn normalize_path(path: &str) -> String {
    match path {
        "/" | "/health" | "/metrics" => path.to_string(),
        _ => {
            if let Some(admin_path) = path.strip_prefix("/__admin") {
                let admin_path = admin_path.trim_start_matches('/');
                if let Some(rest) = admin_path.strip_prefix("files/") {
                    if !rest.is_empty() {
                        return "/__admin/files/{key}".to_string();
                    }
                }
                if let Some(rest) = admin_path.strip_prefix("mappings/") {
                    if rest != "reset" && !rest.is_empty() {
                        return "/__admin/mappings/{id}".to_string();
                    }
                }
                if admin_path.is_empty() {
                    return "/__admin".to_string();
                }
                return format!("/__admin/{admin_path}");
            }
            "/{client}".to_string()
        }
    }
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /metrics` -- Render Prometheus exposition format text.
pub async fn metrics_handler() -> impl IntoResponse {
    let handle = PROMETHEUS_HANDLE
        .get()
        .expect("Prometheus recorder not initialized");
    let body = handle.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_fixed_routes() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn test_normalize_path_admin_collections() {
        assert_eq!(normalize_path("/__admin/mappings"), "/__admin/mappings");
        assert_eq!(
            normalize_path("/__admin/mappings/reset"),
            "/__admin/mappings/reset"
        );
        assert_eq!(normalize_path("/__admin/requests"), "/__admin/requests");
        assert_eq!(normalize_path("/__admin/files"), "/__admin/files");
    }

    #[test]
    fn test_normalize_path_admin_items_templated() {
        assert_eq!(
            normalize_path("/__admin/mappings/11111111-1111-1111-1111-111111111111"),
            "/__admin/mappings/{id}"
        );
        assert_eq!(
            normalize_path("/__admin/files/dir/body.json"),
            "/__admin/files/{key}"
        );
    }

    #[test]
    fn test_normalize_path_client_traffic_collapses() {
        assert_eq!(normalize_path("/any/stubbed/route"), "/{client}");
        assert_eq!(normalize_path("/items"), "/{client}");
    }
}
