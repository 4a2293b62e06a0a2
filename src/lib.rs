//! StubGate library -- HTTP stub-serving gateway over cloud object storage.
//!
//! This crate provides the core components for running a stub server whose
//! state survives stateless function invocations: a provider-agnostic
//! object-store abstraction, adapters for stub mappings and response body
//! files, cold-start bulk loading, inline-body normalization, and the
//! admin/client HTTP surfaces around an embedded matching engine.

use std::sync::Arc;

pub mod config;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod normalize;
pub mod server;
pub mod storage;
pub mod stores;

use crate::config::Config;
use crate::engine::MockEngine;
use crate::storage::store::ObjectStore;
use crate::stores::blob::FileStore;
use crate::stores::mappings::StubStore;

/// Shared application state passed to all handlers via
/// `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The backing object store.
    pub store: Arc<dyn ObjectStore>,
    /// Response body file adapter (`__files/` namespace).
    pub files: Arc<FileStore>,
    /// Stub definition adapter (`mappings/` namespace).
    pub mappings: Arc<StubStore>,
    /// The embedded stub-matching engine.
    pub engine: Arc<MockEngine>,
}

impl AppState {
    /// Wire the adapters and engine over an object store.
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        let files = Arc::new(FileStore::new(store.clone()));
        let mappings = Arc::new(StubStore::new(store.clone()));
        let engine = Arc::new(MockEngine::new(files.clone()));
        Self {
            config,
            store,
            files,
            mappings,
            engine,
        }
    }
}
