//! Literature search endpoint.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use pubminer_common::{PubMinerError, Severity};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::status_for;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default, alias = "q")]
    pub term: String,
}

/// Body returned when the chain fails; counts are zeroed and no items are sent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFailure {
    pub search_term: String,
    pub items_found: u64,
    pub items_returned: u64,
    pub error: String,
    pub severity: Severity,
}

impl SearchFailure {
    pub fn new(term: &str, err: &PubMinerError) -> Self {
        Self {
            search_term: term.to_string(),
            items_found: 0,
            items_returned: 0,
            error: err.to_string(),
            severity: err.severity(),
        }
    }
}

/// GET /api/search?term=... - esearch → elink → esummary
pub async fn search(State(state): State<SharedState>, Query(query): Query<SearchQuery>) -> Response {
    match state.chain.search(&query.term).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!(term = %query.term, error = %e, "Search failed");
            (status_for(&e), Json(SearchFailure::new(&query.term, &e))).into_response()
        }
    }
}
