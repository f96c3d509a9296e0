//! Triage endpoints.
//!
//! None of these can fail once the body has been parsed: the engine always
//! produces a result.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use orthoassist_core::{Detection, TriageResult};
use orthoassist_triage::{
    Diagnosis, DiagnosisTriage, Findings, ImageDescriptor, QuickTriage, SymptomTriage,
    TriageRequest,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::state::AppState;

// ── Full pipeline ───────────────────────────────────────────────────

pub async fn triage(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TriageRequest>,
) -> Json<TriageResult> {
    let result = state.engine.process(&req).await;
    info!(
        level = %result.level,
        method = %result.method,
        confidence = result.confidence,
        partial = result.partial,
        detections = req.detections.len(),
        "triage completed"
    );
    Json(result)
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub body_part: Option<String>,
    #[serde(default)]
    pub request_id: Option<Uuid>,
}

/// Rule and blend pipeline without the disclaimer and partial stamping.
pub async fn triage_classify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClassifyRequest>,
) -> Json<TriageResult> {
    let result = state
        .engine
        .classify_urgency(
            &req.detections,
            req.symptoms.as_deref(),
            req.body_part.as_deref(),
            req.request_id,
        )
        .await;
    Json(result)
}

// ── Simpler variants ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QuickRequest {
    #[serde(default)]
    pub image_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub image_size: u64,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub priority: bool,
}

pub async fn triage_quick(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuickRequest>,
) -> Json<QuickTriage> {
    let image = ImageDescriptor {
        name: req.image_name,
        content_type: req.content_type,
        size_bytes: req.image_size,
    };
    Json(
        state
            .engine
            .quick_assess(&image, req.symptoms.as_deref(), req.priority),
    )
}

#[derive(Debug, Deserialize)]
pub struct SymptomRequest {
    pub symptoms: String,
    #[serde(default)]
    pub findings: Findings,
    #[serde(default)]
    pub age: Option<u32>,
}

pub async fn triage_symptoms(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SymptomRequest>,
) -> Json<SymptomTriage> {
    Json(
        state
            .engine
            .assess_from_symptoms(&req.symptoms, &req.findings, req.age),
    )
}

#[derive(Debug, Deserialize)]
pub struct DiagnosisRequest {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub diagnosis: Diagnosis,
}

pub async fn triage_diagnosis(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DiagnosisRequest>,
) -> Json<DiagnosisTriage> {
    Json(state.engine.assess(&req.detections, &req.diagnosis))
}
