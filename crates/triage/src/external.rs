//! Seam for the secondary (LLM-backed) assessment service.

use async_trait::async_trait;
use orthoassist_core::{Detection, ExternalAssessment, TriageError};

/// Produces a second opinion shaped like a rule result.
///
/// Implementations should map every failure to
/// [`TriageError::ExternalAssessment`]; the orchestrator treats any error
/// as a reason to fall back to the rule result.
#[async_trait]
pub trait ExternalAssessor: Send + Sync {
    async fn generate_assessment(
        &self,
        detections: &[Detection],
        symptoms: Option<&str>,
        body_part: Option<&str>,
    ) -> Result<ExternalAssessment, TriageError>;

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;
}
