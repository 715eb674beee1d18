//! Shared application state for the web server.

use std::sync::Arc;

use pubminer_ingestion::QueryChain;

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub chain: QueryChain,
    /// Upper bound on concurrent detail fetches per batch request
    pub detail_concurrency: usize,
}

impl AppState {
    pub fn new(chain: QueryChain) -> Self {
        let detail_concurrency = chain.config().detail_concurrency.max(1);
        Self { chain, detail_concurrency }
    }
}

pub type SharedState = Arc<AppState>;
