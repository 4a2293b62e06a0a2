//! Embedded stub-matching engine.
//!
//! Holds the in-memory stub table and request journal, matches incoming
//! requests against stub request specs, and renders the matched response,
//! resolving externalized body files through the [`FileStore`].
//!
//! The table is process-local state; durability is the storage adapters'
//! concern.  Stubs inserted by the cold-start loader are marked
//! non-persistent so engine-internal mutation never triggers a re-save.

pub mod stub;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::AdminError;
use crate::stores::blob::FileStore;
use self::stub::{NearMiss, RequestSpec, ServeEvent, ServeRequest, ServeResponse, StubDefinition};

/// Near misses reported per unmatched request.
const NEAR_MISS_LIMIT: usize = 3;

/// In-process stub-matching engine.
pub struct MockEngine {
    /// Blob store for externalized response bodies.
    files: Arc<FileStore>,
    /// Active stub table, insertion-ordered.
    stubs: tokio::sync::RwLock<Vec<StubDefinition>>,
    /// Seed stubs restored by a mappings reset.
    defaults: tokio::sync::RwLock<Vec<StubDefinition>>,
    /// Served-request journal.
    journal: tokio::sync::RwLock<Vec<ServeEvent>>,
}

impl MockEngine {
    pub fn new(files: Arc<FileStore>) -> Self {
        Self {
            files,
            stubs: tokio::sync::RwLock::new(Vec::new()),
            defaults: tokio::sync::RwLock::new(Vec::new()),
            journal: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    // ── Stub table ─────────────────────────────────────────────────

    /// Add or replace a stub (same id replaces in place).
    pub async fn add_stub(&self, stub: StubDefinition) -> Result<(), AdminError> {
        validate_request_spec(&stub.request)?;
        let mut stubs = self.stubs.write().await;
        match stubs.iter_mut().find(|s| s.id == stub.id) {
            Some(slot) => *slot = stub,
            None => stubs.push(stub),
        }
        Ok(())
    }

    /// Replace an existing stub; the id must already be present.
    pub async fn edit_stub(&self, stub: StubDefinition) -> Result<(), AdminError> {
        validate_request_spec(&stub.request)?;
        let mut stubs = self.stubs.write().await;
        match stubs.iter_mut().find(|s| s.id == stub.id) {
            Some(slot) => {
                *slot = stub;
                Ok(())
            }
            None => Err(AdminError::NotFound {
                message: format!("Stub mapping not found: {}", stub.id),
            }),
        }
    }

    /// Remove a stub, returning it when present.
    pub async fn remove_stub(&self, id: Uuid) -> Option<StubDefinition> {
        let mut stubs = self.stubs.write().await;
        let pos = stubs.iter().position(|s| s.id == id)?;
        Some(stubs.remove(pos))
    }

    pub async fn get_stub(&self, id: Uuid) -> Option<StubDefinition> {
        self.stubs.read().await.iter().find(|s| s.id == id).cloned()
    }

    pub async fn list_stubs(&self) -> Vec<StubDefinition> {
        self.stubs.read().await.clone()
    }

    pub async fn stub_count(&self) -> usize {
        self.stubs.read().await.len()
    }

    /// Insert a stub loaded from durable storage.  Forced non-persistent:
    /// it is already durable, re-saving on engine mutation would be
    /// redundant.
    pub async fn insert_loaded(&self, mut stub: StubDefinition) -> Result<(), AdminError> {
        stub.persistent = false;
        self.add_stub(stub).await
    }

    /// Register a seed default, present at startup and restored on reset.
    pub async fn register_default(&self, stub: StubDefinition) -> Result<(), AdminError> {
        validate_request_spec(&stub.request)?;
        self.defaults.write().await.push(stub.clone());
        self.add_stub(stub).await
    }

    /// Drop every stub, defaults included.
    pub async fn clear_stubs(&self) {
        self.stubs.write().await.clear();
    }

    /// Drop every stub and restore the seed defaults.
    pub async fn reset_mappings(&self) {
        let defaults = self.defaults.read().await.clone();
        info!(
            "resetting stub table to {} default mapping(s)",
            defaults.len()
        );
        *self.stubs.write().await = defaults;
    }

    // ── Journal ────────────────────────────────────────────────────

    pub async fn all_requests(&self) -> Vec<ServeEvent> {
        self.journal.read().await.clone()
    }

    pub async fn unmatched_requests(&self) -> Vec<ServeEvent> {
        self.journal
            .read()
            .await
            .iter()
            .filter(|e| !e.was_matched)
            .cloned()
            .collect()
    }

    pub async fn reset_requests(&self) {
        self.journal.write().await.clear();
    }

    /// Closest stubs for each unmatched journal entry.
    pub async fn near_misses_for_unmatched(&self) -> Vec<NearMiss> {
        let journal = self.journal.read().await;
        let stubs = self.stubs.read().await;

        let mut result = Vec::new();
        for event in journal.iter().filter(|e| !e.was_matched) {
            let req = ServeRequest::new(
                &event.request.method,
                &event.request.url,
                event.request.headers.clone(),
                event
                    .request
                    .body
                    .clone()
                    .map(Bytes::from)
                    .unwrap_or_default(),
            );

            let mut misses: Vec<NearMiss> = stubs
                .iter()
                .map(|stub| {
                    let (matched, total) = match_components(&stub.request, &req);
                    let match_ratio = if total == 0 {
                        1.0
                    } else {
                        matched as f64 / total as f64
                    };
                    NearMiss {
                        request: event.request.clone(),
                        stub_id: stub.id,
                        match_ratio,
                    }
                })
                .collect();

            misses.sort_by(|a, b| {
                b.match_ratio
                    .partial_cmp(&a.match_ratio)
                    .unwrap_or(Ordering::Equal)
            });
            result.extend(misses.into_iter().take(NEAR_MISS_LIMIT));
        }
        result
    }

    // ── Serving ────────────────────────────────────────────────────

    /// Match and serve a client request, recording it in the journal.
    pub async fn serve(&self, req: ServeRequest) -> ServeResponse {
        let matched: Option<StubDefinition> = {
            let stubs = self.stubs.read().await;
            let mut ordered: Vec<&StubDefinition> = stubs.iter().collect();
            ordered.sort_by_key(|s| s.effective_priority());
            ordered
                .into_iter()
                .find(|s| request_matches(&s.request, &req))
                .cloned()
        };

        self.journal.write().await.push(ServeEvent {
            request: req.logged(),
            stub_id: matched.as_ref().map(|s| s.id),
            was_matched: matched.is_some(),
        });

        match matched {
            Some(stub) => self.render(stub).await,
            None => {
                debug!("request was not matched: {} {}", req.method, req.url);
                plain_response(404, "Request was not matched")
            }
        }
    }

    /// Render a matched stub's response, resolving the body source.
    async fn render(&self, stub: StubDefinition) -> ServeResponse {
        let mut headers = stub.response.headers.clone();
        headers.insert("Matched-Stub-Id".to_string(), stub.id.to_string());

        let body = if let Some(ref name) = stub.response.body_file_name {
            match self.files.get(name).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    error!("response body file '{name}' missing for stub {}", stub.id);
                    return plain_response(500, "Unable to serve response body");
                }
                Err(err) => {
                    error!(
                        "failed to read response body file '{name}' for stub {}: {err}",
                        stub.id
                    );
                    return plain_response(500, "Unable to serve response body");
                }
            }
        } else if let Some(ref encoded) = stub.response.base64_body {
            match BASE64_STANDARD.decode(encoded.trim()) {
                Ok(decoded) => Bytes::from(decoded),
                Err(err) => {
                    error!("invalid base64Body on stub {}: {err}", stub.id);
                    return plain_response(500, "Unable to serve response body");
                }
            }
        } else if let Some(ref text) = stub.response.body {
            Bytes::copy_from_slice(text.as_bytes())
        } else {
            Bytes::new()
        };

        ServeResponse {
            status: stub.response.status,
            headers,
            body,
        }
    }
}

/// Engine-defined plain-text response (unmatched, body unavailable).
fn plain_response(status: u16, message: &str) -> ServeResponse {
    let mut headers = BTreeMap::new();
    headers.insert(
        "Content-Type".to_string(),
        "text/plain; charset=utf-8".to_string(),
    );
    ServeResponse {
        status,
        headers,
        body: Bytes::copy_from_slice(message.as_bytes()),
    }
}

/// Reject stubs whose `urlPattern` does not compile.
fn validate_request_spec(spec: &RequestSpec) -> Result<(), AdminError> {
    if let Some(ref pattern) = spec.url_pattern {
        Regex::new(pattern)
            .map_err(|e| AdminError::invalid(format!("Invalid urlPattern '{pattern}': {e}")))?;
    }
    Ok(())
}

/// Whether every present matcher component is satisfied.
fn request_matches(spec: &RequestSpec, req: &ServeRequest) -> bool {
    let (matched, total) = match_components(spec, req);
    matched == total
}

/// Count satisfied vs present matcher components, for matching and
/// near-miss scoring.
fn match_components(spec: &RequestSpec, req: &ServeRequest) -> (usize, usize) {
    let mut matched = 0;
    let mut total = 0;

    if let Some(ref method) = spec.method {
        if !method.eq_ignore_ascii_case("ANY") {
            total += 1;
            if method.eq_ignore_ascii_case(&req.method) {
                matched += 1;
            }
        }
    }

    if let Some(ref url) = spec.url {
        total += 1;
        if *url == req.url {
            matched += 1;
        }
    }

    if let Some(ref url_path) = spec.url_path {
        total += 1;
        if *url_path == req.path {
            matched += 1;
        }
    }

    if let Some(ref pattern) = spec.url_pattern {
        total += 1;
        let anchored = format!("^(?:{pattern})$");
        if Regex::new(&anchored)
            .map(|re| re.is_match(&req.url))
            .unwrap_or(false)
        {
            matched += 1;
        }
    }

    for (name, value) in &spec.query_parameters {
        total += 1;
        if req.query.get(name) == Some(value) {
            matched += 1;
        }
    }

    for (name, value) in &spec.headers {
        total += 1;
        let found = req
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v);
        if found == Some(value) {
            matched += 1;
        }
    }

    (matched, total)
}
