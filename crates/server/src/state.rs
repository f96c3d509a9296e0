use std::sync::Arc;

use orthoassist_core::Config;
use orthoassist_llm::LlmAssessor;
use orthoassist_report::ReportRenderer;
use orthoassist_triage::{EngineSettings, InMemoryPolicyStore, TriageEngine};
use tracing::{info, warn};

pub struct AppState {
    pub engine: Arc<TriageEngine>,
    pub reports: ReportRenderer,
    pub llm_configured: bool,
}

impl AppState {
    pub fn new(engine: TriageEngine) -> Self {
        let llm_configured = engine.has_assessor();
        Self {
            engine: Arc::new(engine),
            reports: ReportRenderer::new(),
            llm_configured,
        }
    }

    /// Wire config → policy store → assessor → engine.
    ///
    /// A missing or broken LLM setup only disables the second opinion; a
    /// policy file that fails to load is fatal.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = match &config.triage.policy_path {
            Some(path) => InMemoryPolicyStore::from_file(path)?,
            None => {
                info!("no TRIAGE_POLICY_PATH set, using built-in triage policy");
                InMemoryPolicyStore::builtin()
            }
        };

        let settings = EngineSettings::from(&config.triage);
        let mut engine = TriageEngine::new(Arc::new(store), settings);

        if config.triage.llm_fallback_enabled {
            match LlmAssessor::from_config(&config.llm, &config.ollama) {
                Ok(assessor) => engine = engine.with_assessor(Arc::new(assessor)),
                Err(e) => warn!(
                    error = %e,
                    "LLM assessor not available, low-confidence results will use rules only"
                ),
            }
        }

        Ok(Self::new(engine))
    }
}
