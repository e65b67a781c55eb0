use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::processor::{KpiDefinition, KpiProcessor, KpiSubmission, ProcessorError};

/// Router builder exposing KPI evaluation and the catalog listing.
pub fn kpi_router(processor: Arc<KpiProcessor>) -> Router {
    Router::new()
        .route("/api/v1/kpi", get(catalog_handler))
        .route("/api/v1/kpi/evaluate", post(evaluate_handler))
        .with_state(processor)
}

pub(crate) async fn evaluate_handler(
    State(processor): State<Arc<KpiProcessor>>,
    Json(submission): Json<KpiSubmission>,
) -> Response {
    match processor.process(&submission) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error @ ProcessorError::UnknownKpi(_)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn catalog_handler(
    State(processor): State<Arc<KpiProcessor>>,
) -> Json<Vec<KpiDefinition>> {
    Json(processor.catalog().definitions().cloned().collect())
}
