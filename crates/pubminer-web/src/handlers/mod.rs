//! HTTP handlers for all web routes.

pub mod detail;
pub mod search;

use axum::http::StatusCode;
use pubminer_common::{ErrorKind, PubMinerError};

/// Status code reported for a failed upstream interaction.
pub fn status_for(err: &PubMinerError) -> StatusCode {
    match err.kind() {
        ErrorKind::TransportError => StatusCode::BAD_GATEWAY,
        ErrorKind::InvalidDocumentFormat => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
