use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::memory::SessionMemory;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub q: Option<String>,
    pub session_id: Option<String>,
}

/// Answers a natural-language question about the outlets.
///
/// A missing `q` is treated like an empty one and rejected with 400.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = SessionMemory::normalize_id(params.session_id.as_deref());
    let raw = params.q.unwrap_or_default();
    let timeout = state.config.retrieval.query_timeout();

    let span = tracing::info_span!(
        "query",
        request_id = %Uuid::new_v4(),
        session_id = %session_id
    );

    let answer = tokio::time::timeout(timeout, state.pipeline.answer_query(&session_id, &raw))
        .instrument(span)
        .await
        .map_err(|_| {
            ApiError::Upstream(format!("query timed out after {}s", timeout.as_secs()))
        })??;

    Ok(Json(answer))
}
