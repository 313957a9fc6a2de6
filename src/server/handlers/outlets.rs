use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::outlets::geo::density_report;
use crate::state::AppState;

const DEFAULT_RADIUS_KM: f64 = 5.0;
const MAX_RADIUS_KM: f64 = 50.0;

/// Every stored outlet, served from the TTL cache.
pub async fn list_outlets(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let outlets = state.cache.outlets().await?;
    Ok(Json(outlets.as_ref().clone()))
}

#[derive(Debug, Deserialize)]
pub struct DensityParams {
    pub radius_km: Option<f64>,
}

/// How many other outlets sit within `radius_km` of each located outlet.
pub async fn outlet_density(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DensityParams>,
) -> Result<impl IntoResponse, ApiError> {
    let radius_km = params.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !(radius_km > 0.0 && radius_km <= MAX_RADIUS_KM) {
        return Err(ApiError::BadRequest(format!(
            "radius_km must be greater than 0 and at most {}.",
            MAX_RADIUS_KM
        )));
    }

    let outlets = state.cache.outlets().await?;
    Ok(Json(density_report(&outlets, radius_km)))
}
