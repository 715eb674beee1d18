//! Abstract retrieval endpoints.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use pubminer_ingestion::{AbstractSections, DetailResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::status_for;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub ids: Vec<String>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DetailBody {
    Sections(AbstractSections),
    Error { error: String },
}

#[derive(Debug, Serialize)]
pub struct DetailEntry {
    pub id: String,
    pub result: DetailBody,
}

impl From<DetailResult> for DetailEntry {
    fn from(r: DetailResult) -> Self {
        let result = match r.outcome {
            Ok(sections) => DetailBody::Sections(sections),
            Err(e) => DetailBody::Error { error: e.to_string() },
        };
        Self { id: r.id, result }
    }
}

/// GET /api/details/{id} - abstract sections of one PMC article
pub async fn detail(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    match state.chain.fetch_detail(&id).await {
        Ok(sections) => Json(sections).into_response(),
        Err(e) => (status_for(&e), Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

/// POST /api/details - abstracts of many articles, in request order
///
/// `concurrency` may lower the configured fan-out but never raise it.
pub async fn batch_details(
    State(state): State<SharedState>,
    Json(req): Json<BatchRequest>,
) -> Json<Vec<DetailEntry>> {
    let concurrency = req
        .concurrency
        .unwrap_or(state.detail_concurrency)
        .clamp(1, state.detail_concurrency);

    let results = state.chain.fetch_details(&req.ids, concurrency).await;
    Json(results.into_iter().map(DetailEntry::from).collect())
}
