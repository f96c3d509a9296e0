//! Report generation and download.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use orthoassist_report::{report_filename, ReportError, ReportInput, ReportRenderer, CONTENT_TYPE};

use super::{api_error, ApiError};
use crate::state::AppState;

fn attachment(request_id: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename={}", report_filename(request_id));
    (
        [
            (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

fn render_error(e: ReportError) -> ApiError {
    match &e {
        ReportError::InvalidInput(msg) => api_error(StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
        ReportError::Template(_) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to generate report: {}", e),
        ),
    }
}

/// Render a report for an analysis payload.
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    Json(analysis): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let input = ReportInput::from_analysis(&analysis).map_err(render_error)?;
    let bytes = state.reports.render(&input).map_err(render_error)?;
    Ok(attachment(&input.request_id, bytes))
}

/// Sample report for `request_id`; analyses are not stored server-side.
pub async fn download_report(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> Result<Response, ApiError> {
    let input = ReportRenderer::sample(&request_id);
    let bytes = state.reports.render(&input).map_err(render_error)?;
    Ok(attachment(&request_id, bytes))
}
