use thiserror::Error;

/// Failure modes of a triage assessment.
///
/// None of these ever reach the caller of the orchestrator; they are
/// caught at the config-resolution step, the external-call site, or the
/// orchestrator boundary and turned into a degraded result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("External assessment failed: {0}")]
    ExternalAssessment(String),

    #[error("External assessment timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("{0}")]
    Fault(String),
}

impl TriageError {
    /// True for failures of the secondary assessment service.
    pub fn is_external(&self) -> bool {
        matches!(self, TriageError::ExternalAssessment(_) | TriageError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_counts_as_external() {
        assert!(TriageError::Timeout { secs: 10 }.is_external());
        assert!(TriageError::ExternalAssessment("503".into()).is_external());
        assert!(!TriageError::Fault("nan".into()).is_external());
        assert!(!TriageError::Configuration("missing".into()).is_external());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            TriageError::Timeout { secs: 5 }.to_string(),
            "External assessment timed out after 5s"
        );
        assert_eq!(TriageError::Fault("boom".into()).to_string(), "boom");
    }
}
