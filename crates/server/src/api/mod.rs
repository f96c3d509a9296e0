//! HTTP endpoint modules.
//!
//! Shared error payload lives here; each sub-module owns one area.

mod health;
mod reports;
mod triage;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

// ── Re-exports ───────────────────────────────────────────────────

pub use health::health;
pub use reports::{download_report, generate_report};
pub use triage::{triage, triage_classify, triage_diagnosis, triage_quick, triage_symptoms};
