//! Triage orchestrator.
//!
//! Runs the rule classifier, decides whether a second opinion is needed,
//! and guarantees that every request produces a [`TriageResult`]. Nothing
//! escapes as an error: faults degrade to a safe AMBER result.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use orthoassist_core::config::TriageSettings;
use orthoassist_core::{
    Detection, ExternalAssessment, Method, TriageError, TriageResult, MEDICAL_DISCLAIMER,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::blender::blend;
use crate::classifier::RuleClassifier;
use crate::external::ExternalAssessor;
use crate::policy::TriageConfig;
use crate::store::PolicyStore;
use crate::variants::{
    self, Diagnosis, DiagnosisTriage, Findings, ImageDescriptor, QuickTriage, SymptomTriage,
};

const CLASSIFY_FAILED: &str = "Triage assessment failed, recommend medical evaluation";
const PROCESSING_FAILED: &str = "Triage assessment unavailable, recommend medical evaluation";

/// Runtime switches for the orchestrator.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub llm_fallback_enabled: bool,
    pub external_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&TriageSettings::default())
    }
}

impl From<&TriageSettings> for EngineSettings {
    fn from(s: &TriageSettings) -> Self {
        Self {
            llm_fallback_enabled: s.llm_fallback_enabled,
            external_timeout: Duration::from_secs(s.external_timeout_secs),
        }
    }
}

/// Input of the top-level triage entry point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageRequest {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub body_part: Option<String>,
    /// Upstream stages already produced a degraded result.
    #[serde(default)]
    pub upstream_partial: bool,
    #[serde(default)]
    pub request_id: Option<Uuid>,
}

/// Per-process triage service. Holds no per-request state; share it
/// behind an `Arc` and call it from any number of tasks.
pub struct TriageEngine {
    policy: Arc<dyn PolicyStore>,
    assessor: Option<Arc<dyn ExternalAssessor>>,
    settings: EngineSettings,
}

impl TriageEngine {
    pub fn new(policy: Arc<dyn PolicyStore>, settings: EngineSettings) -> Self {
        info!(
            llm_fallback = settings.llm_fallback_enabled,
            timeout_secs = settings.external_timeout.as_secs(),
            "triage engine initialized"
        );
        Self {
            policy,
            assessor: None,
            settings,
        }
    }

    /// Attach the secondary assessment service.
    pub fn with_assessor(mut self, assessor: Arc<dyn ExternalAssessor>) -> Self {
        info!(assessor = assessor.name(), "external assessor attached");
        self.assessor = Some(assessor);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn has_assessor(&self) -> bool {
        self.assessor.is_some()
    }

    // ── Full pipeline ───────────────────────────────────────────────

    /// Top-level contract: classify, then stamp the disclaimer and
    /// propagate the partial flag. Never fails, even if classification
    /// panics.
    pub async fn process_triage_request(
        &self,
        detections: &[Detection],
        symptoms: Option<&str>,
        body_part: Option<&str>,
        upstream_partial: bool,
        request_id: Option<Uuid>,
    ) -> TriageResult {
        let start = Instant::now();
        let classified =
            AssertUnwindSafe(self.classify_urgency(detections, symptoms, body_part, request_id))
                .catch_unwind()
                .await;

        let mut result = match classified {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(error = %message, "triage processing failed");
                let mut r =
                    TriageResult::safe_fallback(Method::ErrorFallback, PROCESSING_FAILED, message);
                r.inference_time_ms = elapsed_ms(start);
                r
            }
        };

        if upstream_partial || result.error.is_some() {
            result.partial = true;
        }
        result.medical_disclaimer = Some(MEDICAL_DISCLAIMER.to_string());
        result
    }

    /// [`process_triage_request`](Self::process_triage_request) for a
    /// deserialized request.
    pub async fn process(&self, request: &TriageRequest) -> TriageResult {
        self.process_triage_request(
            &request.detections,
            request.symptoms.as_deref(),
            request.body_part.as_deref(),
            request.upstream_partial,
            request.request_id,
        )
        .await
    }

    /// Rule classification, blended with the external opinion when rule
    /// confidence is below `high_confidence_threshold`.
    pub async fn classify_urgency(
        &self,
        detections: &[Detection],
        symptoms: Option<&str>,
        body_part: Option<&str>,
        request_id: Option<Uuid>,
    ) -> TriageResult {
        let start = Instant::now();
        let mut result = match self
            .try_classify(detections, symptoms, body_part, request_id)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "triage classification failed");
                TriageResult::safe_fallback(Method::Fallback, CLASSIFY_FAILED, e.to_string())
            }
        };
        result.inference_time_ms = elapsed_ms(start);
        result
    }

    async fn try_classify(
        &self,
        detections: &[Detection],
        symptoms: Option<&str>,
        body_part: Option<&str>,
        request_id: Option<Uuid>,
    ) -> Result<TriageResult, TriageError> {
        let config = self.resolve_config(request_id);
        let outcome = RuleClassifier::new(&config).classify(detections, symptoms, body_part)?;

        if outcome.confidence >= config.high_confidence_threshold {
            info!(
                level = %outcome.level,
                confidence = outcome.confidence,
                "high-confidence rule-based triage"
            );
            return Ok(outcome.into_result(Method::Rules));
        }

        let assessor = match &self.assessor {
            Some(a) if self.settings.llm_fallback_enabled => a,
            _ => return Ok(outcome.into_result(Method::RulesFallback)),
        };

        debug!(assessor = assessor.name(), "requesting external triage assessment");
        match self
            .consult(assessor.as_ref(), detections, symptoms, body_part)
            .await
        {
            Ok(external) => Ok(blend(&outcome, &external).into_result(outcome)),
            Err(e) => {
                warn!(error = %e, "external assessment unavailable, using rule result");
                let mut result = outcome.into_result(Method::RulesFallback);
                result.error = Some(e.to_string());
                Ok(result)
            }
        }
    }

    /// Policy for this request; built-in defaults if the store fails.
    fn resolve_config(&self, request_id: Option<Uuid>) -> TriageConfig {
        match self.policy.get_triage_config(request_id) {
            Ok(config) => config,
            Err(e) => {
                let e = TriageError::from(e);
                warn!(error = %e, "falling back to built-in triage policy");
                TriageConfig::default()
            }
        }
    }

    async fn consult(
        &self,
        assessor: &dyn ExternalAssessor,
        detections: &[Detection],
        symptoms: Option<&str>,
        body_part: Option<&str>,
    ) -> Result<ExternalAssessment, TriageError> {
        let timeout = self.settings.external_timeout;
        let call = assessor.generate_assessment(detections, symptoms, body_part);
        let assessment = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| TriageError::Timeout {
                secs: timeout.as_secs(),
            })??;

        if !assessment.confidence.is_finite() {
            return Err(TriageError::ExternalAssessment(
                "assessment confidence is not a number".into(),
            ));
        }
        Ok(ExternalAssessment {
            confidence: assessment.confidence.clamp(0.0, 1.0),
            ..assessment
        })
    }

    // ── Simpler variants ────────────────────────────────────────────

    /// Diagnosis-driven keyword triage.
    pub fn assess(&self, detections: &[Detection], diagnosis: &Diagnosis) -> DiagnosisTriage {
        variants::assess(detections, diagnosis)
    }

    /// Fast path for urgent intake; `priority` forces RED.
    pub fn quick_assess(
        &self,
        image: &ImageDescriptor,
        symptoms: Option<&str>,
        priority: bool,
    ) -> QuickTriage {
        variants::quick_assess(image, symptoms, priority)
    }

    /// Symptom and age scoring, independent of image detections.
    pub fn assess_from_symptoms(
        &self,
        symptoms: &str,
        findings: &Findings,
        age: Option<u32>,
    ) -> SymptomTriage {
        variants::assess_from_symptoms(symptoms, findings, age)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "triage task panicked".to_string()
    }
}
