//! Policy store: resolves the [`TriageConfig`] snapshot for a request.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use tracing::info;
use uuid::Uuid;

use crate::policy::{PolicyError, TriageConfig, TriagePolicyDocument};

/// Source of tunable thresholds and keyword lists.
pub trait PolicyStore: Send + Sync {
    /// Owned snapshot of the config for `request_id` (or the default
    /// policy when no id is given or no override exists).
    fn get_triage_config(&self, request_id: Option<Uuid>) -> Result<TriageConfig, PolicyError>;
}

/// Default policy plus optional per-request overrides, held in memory.
pub struct InMemoryPolicyStore {
    default: TriageConfig,
    overrides: RwLock<HashMap<Uuid, TriageConfig>>,
}

impl InMemoryPolicyStore {
    /// Store serving `config` after validating it.
    pub fn new(config: TriageConfig) -> Result<Self, PolicyError> {
        Ok(Self {
            default: config.validated()?,
            overrides: RwLock::new(HashMap::new()),
        })
    }

    /// Store serving the built-in policy.
    pub fn builtin() -> Self {
        Self {
            default: TriageConfig::default(),
            overrides: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        let doc = TriagePolicyDocument::from_yaml_str(yaml)?;
        Self::new(doc.compile()?)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let doc = TriagePolicyDocument::from_file(path)?;
        info!(policy_id = %doc.metadata.id, path = %path.display(), "loaded triage policy");
        Self::new(doc.compile()?)
    }

    /// Serve `config` for one request id instead of the default.
    pub fn set_override(&self, request_id: Uuid, config: TriageConfig) -> Result<(), PolicyError> {
        let config = config.validated()?;
        self.overrides
            .write()
            .map_err(|_| PolicyError::Validation("policy override map poisoned".into()))?
            .insert(request_id, config);
        Ok(())
    }

    pub fn clear_override(&self, request_id: Uuid) -> bool {
        match self.overrides.write() {
            Ok(mut map) => map.remove(&request_id).is_some(),
            Err(_) => false,
        }
    }

    pub fn default_config(&self) -> &TriageConfig {
        &self.default
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn get_triage_config(&self, request_id: Option<Uuid>) -> Result<TriageConfig, PolicyError> {
        let Some(id) = request_id else {
            return Ok(self.default.clone());
        };
        let overrides = self
            .overrides
            .read()
            .map_err(|_| PolicyError::Validation("policy override map poisoned".into()))?;
        Ok(overrides.get(&id).cloned().unwrap_or_else(|| self.default.clone()))
    }
}
