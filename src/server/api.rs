//! Route definitions

use super::{handlers, state::AppState};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Not found. Visit / for the form or /api/health to check API status.",
        })),
    )
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/predict", post(handlers::predict_json))
        .route("/risk-info", get(handlers::risk_info))
        .route("/health", get(handlers::health_check))
        .fallback(handle_404);

    Router::new()
        .route("/", get(handlers::serve_index))
        .route("/predict", post(handlers::predict_form))
        .nest("/api", api_routes)
        .fallback(handle_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
