//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/triage", post(api::triage))
        .route("/api/triage/classify", post(api::triage_classify))
        .route("/api/triage/quick", post(api::triage_quick))
        .route("/api/triage/symptoms", post(api::triage_symptoms))
        .route("/api/triage/diagnosis", post(api::triage_diagnosis))
        .route("/api/generate-report", post(api::generate_report))
        .route("/api/download-report/{request_id}", get(api::download_report))
        .layer(cors)
        .with_state(state)
}

/// `*` allows any origin; otherwise a comma-separated origin list.
pub fn cors_layer(origins: &str) -> CorsLayer {
    if origins.trim() == "*" {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
}
