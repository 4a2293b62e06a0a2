//! Stub mapping data model.
//!
//! Mirrors the administrative JSON contract: a stub has an `id`, a
//! `request` matcher spec, a `response` spec, and a `persistent` flag
//! governing whether it survives beyond the current process.  Unknown
//! matcher operators are not modeled; the dialect below is this engine's
//! documented contract.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Priority assigned when a stub does not set one (lower wins).
pub const DEFAULT_PRIORITY: u32 = 5;

fn default_status() -> u16 {
    200
}

/// A stub mapping: how to respond to a class of incoming requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubDefinition {
    /// Unique identifier; generated when the payload omits one.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Request matching specification.
    #[serde(default)]
    pub request: RequestSpec,

    /// Response specification.
    #[serde(default)]
    pub response: ResponseSpec,

    /// Whether the stub must survive beyond the current process.
    #[serde(default)]
    pub persistent: bool,

    /// Match priority; lower values are tried first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl StubDefinition {
    /// Priority used for match ordering.
    pub fn effective_priority(&self) -> u32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// Request matcher dialect.
///
/// All present components must match: `method` (or `ANY`), `url` (exact
/// path + query), `urlPath` (exact path), `urlPattern` (anchored regex
/// over path + query), plus exact-value query parameters and headers
/// (header names compared case-insensitively).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_parameters: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// Response specification.
///
/// At most one body source is meaningful; after normalization a
/// persistent stub only ever carries `bodyFileName`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    #[serde(default = "default_status")]
    pub status: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_file_name: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Default for ResponseSpec {
    fn default() -> Self {
        Self {
            status: default_status(),
            body: None,
            base64_body: None,
            body_file_name: None,
            headers: BTreeMap::new(),
        }
    }
}

/// An incoming request in the engine's serving dialect.
#[derive(Debug, Clone)]
pub struct ServeRequest {
    /// Uppercased HTTP method.
    pub method: String,
    /// Path plus query string, as received.
    pub url: String,
    /// Path component only.
    pub path: String,
    /// Parsed query parameters (first value per name).
    pub query: BTreeMap<String, String>,
    /// Request headers (first value per name).
    pub headers: BTreeMap<String, String>,
    /// Raw request body.
    pub body: Bytes,
}

impl ServeRequest {
    /// Build a request from method and a `path?query` target.
    pub fn new(
        method: &str,
        url: &str,
        headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> Self {
        let (path, query_str) = match url.split_once('?') {
            Some((p, q)) => (p.to_string(), q),
            None => (url.to_string(), ""),
        };

        let mut query = BTreeMap::new();
        for pair in query_str.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            query.entry(name.to_string()).or_insert_with(|| value.to_string());
        }

        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            path,
            query,
            headers,
            body,
        }
    }

    /// Journal form of this request.
    pub fn logged(&self) -> LoggedRequest {
        let body = if self.body.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.body).into_owned())
        };
        LoggedRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body,
        }
    }
}

/// A request as recorded in the journal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedRequest {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// The engine's answer to a serve call.
#[derive(Debug, Clone)]
pub struct ServeResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

/// One journal entry: a served request and what it matched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeEvent {
    pub request: LoggedRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stub_id: Option<Uuid>,
    pub was_matched: bool,
}

/// Closest-stub diagnostic for an unmatched request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearMiss {
    pub request: LoggedRequest,
    pub stub_id: Uuid,
    /// Fraction of the stub's matcher components the request satisfied.
    pub match_ratio: f64,
}
