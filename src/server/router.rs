use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{health, outlets, query};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// Routes are registered with and without the trailing slash so
/// `/outlets` and `/outlets/` both resolve.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.allowed_origins);
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/outlets", get(outlets::list_outlets))
        .route("/outlets/", get(outlets::list_outlets))
        .route("/outlets/density", get(outlets::outlet_density))
        .route("/query", get(query::query))
        .route("/query/", get(query::query))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let origins = resolve_allowed_origins(origins);

    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .into_iter()
                .filter_map(|origin| HeaderValue::from_str(&origin).ok())
                .collect::<Vec<_>>(),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://localhost:8001".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_origin_list_falls_back_to_local_defaults() {
        let origins = resolve_allowed_origins(&["  ".to_string(), String::new()]);
        assert_eq!(origins, default_local_origins());
    }

    #[test]
    fn configured_origins_are_trimmed() {
        let origins = resolve_allowed_origins(&[" https://outlets.example ".to_string()]);
        assert_eq!(origins, vec!["https://outlets.example".to_string()]);
    }
}
