//! TriagePolicy document: pattern lists, classification thresholds and
//! confidence adjustments for the rule classifier.

use std::path::Path;

use orthoassist_core::{normalize_label, TriageError};
use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating a triage policy.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Out-of-range threshold, empty pattern, wrong kind, ...
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<PolicyError> for TriageError {
    fn from(e: PolicyError) -> Self {
        TriageError::Configuration(e.to_string())
    }
}

// ── YAML-level types ────────────────────────────────────────────────

pub const POLICY_KIND: &str = "TriagePolicy";

/// Top-level TriagePolicy document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TriagePolicyDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: PolicyMetadata,
    /// Omitted keys take their built-in defaults.
    #[serde(default)]
    pub spec: TriageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PolicyMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl TriagePolicyDocument {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        let doc: TriagePolicyDocument = serde_yaml::from_str(yaml)?;
        if doc.api_version != "v1" {
            return Err(PolicyError::Validation(format!(
                "apiVersion must be 'v1', got '{}'",
                doc.api_version
            )));
        }
        if doc.kind != POLICY_KIND {
            return Err(PolicyError::Validation(format!(
                "kind must be '{}', got '{}'",
                POLICY_KIND, doc.kind
            )));
        }
        Ok(doc)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Validate and normalize the spec into the snapshot the classifier uses.
    pub fn compile(&self) -> Result<TriageConfig, PolicyError> {
        self.spec.clone().validated()
    }
}

// ── Typed config ────────────────────────────────────────────────────

/// Tunables for one assessment. Treated as a read-only snapshot for the
/// duration of a request.
///
/// Pattern lists need not be disjoint; overlaps resolve RED > GREEN > AMBER.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TriageConfig {
    /// Substrings marking a severe injury.
    pub red_patterns: Vec<String>,
    /// Substrings marking a moderate injury.
    pub amber_patterns: Vec<String>,
    /// Substrings marking a minor injury.
    pub green_patterns: Vec<String>,
    /// Max detection confidence at or above which evidence reaches RED.
    pub red_threshold: f64,
    /// Max detection confidence at or above which evidence reaches AMBER.
    pub amber_threshold: f64,
    /// Rule confidence at or above which the external opinion is skipped;
    /// also the per-detection bar for the confidence boost.
    pub high_confidence_threshold: f64,
    /// Fraction of detections that must match the chosen level's patterns.
    pub consistency_threshold: f64,
    pub consistency_boost: f64,
    pub mixed_severity_penalty: f64,
    pub confidence_boost_per_detection: f64,
    pub default_confidence: f64,
    pub no_detection_confidence: f64,
    pub no_detection_severe_symptoms_confidence: f64,
    pub no_detection_rule_confidence: f64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            red_patterns: strings(&[
                "compound",
                "open",
                "displaced",
                "comminuted",
                "dislocat",
                "avulsion",
                "segmental",
                "severe",
            ]),
            amber_patterns: strings(&[
                "fracture",
                "break",
                "crack",
                "positive",
                "buckle",
                "greenstick",
            ]),
            green_patterns: strings(&[
                "hairline",
                "minor",
                "possible",
                "sprain",
                "strain",
                "contusion",
                "bruise",
                "softtissue",
                "negative",
            ]),
            red_threshold: 0.8,
            amber_threshold: 0.5,
            high_confidence_threshold: 0.85,
            consistency_threshold: 0.7,
            consistency_boost: 0.15,
            mixed_severity_penalty: 0.1,
            confidence_boost_per_detection: 0.05,
            default_confidence: 0.8,
            no_detection_confidence: 0.8,
            no_detection_severe_symptoms_confidence: 0.7,
            no_detection_rule_confidence: 0.8,
        }
    }
}

impl TriageConfig {
    /// Check ranges and normalize patterns. Run once at load time.
    pub fn validated(mut self) -> Result<Self, PolicyError> {
        let unit_fields = [
            ("red_threshold", self.red_threshold),
            ("amber_threshold", self.amber_threshold),
            ("high_confidence_threshold", self.high_confidence_threshold),
            ("consistency_threshold", self.consistency_threshold),
            ("consistency_boost", self.consistency_boost),
            ("mixed_severity_penalty", self.mixed_severity_penalty),
            ("confidence_boost_per_detection", self.confidence_boost_per_detection),
            ("default_confidence", self.default_confidence),
            ("no_detection_confidence", self.no_detection_confidence),
            (
                "no_detection_severe_symptoms_confidence",
                self.no_detection_severe_symptoms_confidence,
            ),
            ("no_detection_rule_confidence", self.no_detection_rule_confidence),
        ];
        for (name, value) in unit_fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(PolicyError::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.amber_threshold > self.red_threshold {
            return Err(PolicyError::Validation(format!(
                "amber_threshold ({}) must not exceed red_threshold ({})",
                self.amber_threshold, self.red_threshold
            )));
        }

        self.red_patterns = normalize_patterns("red_patterns", &self.red_patterns)?;
        self.amber_patterns = normalize_patterns("amber_patterns", &self.amber_patterns)?;
        self.green_patterns = normalize_patterns("green_patterns", &self.green_patterns)?;
        Ok(self)
    }
}

fn normalize_patterns(field: &str, patterns: &[String]) -> Result<Vec<String>, PolicyError> {
    patterns
        .iter()
        .map(|p| {
            let normalized = normalize_label(p);
            if normalized.is_empty() {
                Err(PolicyError::Validation(format!(
                    "{} contains an empty pattern",
                    field
                )))
            } else {
                Ok(normalized)
            }
        })
        .collect()
}

/// True when any pattern occurs in the already-normalized label.
pub(crate) fn matches_any(normalized_label: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| normalized_label.contains(p.as_str()))
}
