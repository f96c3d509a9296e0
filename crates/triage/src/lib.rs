//! R/A/G triage for orthopedic findings.
//!
//! This crate provides:
//! - Symptom lexicon and detection severity scoring
//! - A deterministic rule classifier driven by a YAML `TriagePolicy`
//! - Blending of low-confidence rule outcomes with an external assessment
//! - `TriageEngine`, the orchestrator that always returns a result
//! - Keyword-only quick, diagnosis and symptom assessment variants

pub mod blender;
pub mod classifier;
pub mod engine;
pub mod external;
pub mod lexicon;
pub mod policy;
pub mod scorer;
pub mod store;
pub mod variants;

pub use engine::{EngineSettings, TriageEngine, TriageRequest};
pub use external::ExternalAssessor;
pub use policy::{PolicyError, TriageConfig, TriagePolicyDocument};
pub use store::{InMemoryPolicyStore, PolicyStore};
pub use variants::{Diagnosis, DiagnosisTriage, Findings, ImageDescriptor, QuickTriage, SymptomTriage};
