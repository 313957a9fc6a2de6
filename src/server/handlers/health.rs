use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to the Subway Outlets API. Use /outlets/ for outlet data and /query/?q= to ask questions."
    }))
}

/// Liveness plus a store round-trip; 503 when the store cannot be read.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let counts = async {
        let outlets = state.store.count().await?;
        let embedded = state.store.count_embedded().await?;
        Ok::<_, ApiError>((outlets, embedded))
    }
    .await;

    match counts {
        Ok((outlets_count, embedded_count)) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "outlets_count": outlets_count,
                "embedded_count": embedded_count,
                "active_sessions": state.memory().session_count().await,
            })),
        ),
        Err(err) => {
            tracing::error!("Health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "unavailable",
                })),
            )
        }
    }
}
