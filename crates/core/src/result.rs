use std::fmt;

use serde::{Deserialize, Serialize};

use crate::level::TriageLevel;

/// Appended to every result returned by the top-level triage entry point.
pub const MEDICAL_DISCLAIMER: &str = "\u{26a0} This triage assessment is for informational purposes only. \
Always seek professional medical evaluation for any injury or health concern.";

/// How the final level was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Rule result was confident enough on its own.
    Rules,
    /// Rule result blended with the external assessment.
    Combined,
    /// External assessment disabled or failed; rule result used as-is.
    RulesFallback,
    /// Internal fault during classification.
    Fallback,
    /// Fault escaped classification and was caught at the request boundary.
    ErrorFallback,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Rules => "rules",
            Method::Combined => "combined",
            Method::RulesFallback => "rules_fallback",
            Method::Fallback => "fallback",
            Method::ErrorFallback => "error_fallback",
        };
        f.write_str(s)
    }
}

/// Raw per-bucket weighted scores plus a fixed-weight total
/// (RED×3 + AMBER×2 + GREEN×1).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    pub red_score: f64,
    pub amber_score: f64,
    pub green_score: f64,
    pub total_weighted_score: f64,
}

/// Level and confidence of one source, kept on blended results for audit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubAssessment {
    pub level: TriageLevel,
    pub confidence: f64,
}

/// Opinion returned by the secondary assessment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalAssessment {
    pub level: TriageLevel,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: Vec<String>,
}

/// Final output of a triage request. Built fresh per request and never
/// mutated after it is handed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub level: TriageLevel,
    pub confidence: f64,
    pub rationale: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub method: Method,
    #[serde(default)]
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub inference_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_detection_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_breakdown: Option<SeverityBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_assessment: Option<SubAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_assessment: Option<SubAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_disclaimer: Option<String>,
}

impl TriageResult {
    /// The fixed AMBER result substituted when assessment cannot complete.
    pub fn safe_fallback(method: Method, rationale: &str, error: impl Into<String>) -> Self {
        Self {
            level: TriageLevel::Amber,
            confidence: 0.0,
            rationale: vec![rationale.to_string()],
            recommendations: TriageLevel::Amber.default_recommendations(),
            method,
            partial: true,
            error: Some(error.into()),
            inference_time_ms: 0.0,
            max_detection_score: None,
            severity_breakdown: None,
            rule_assessment: None,
            external_assessment: None,
            medical_disclaimer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_fallback_shape() {
        let r = TriageResult::safe_fallback(Method::Fallback, "failed", "boom");
        assert_eq!(r.level, TriageLevel::Amber);
        assert_eq!(r.confidence, 0.0);
        assert!(r.partial);
        assert_eq!(r.error.as_deref(), Some("boom"));
        assert_eq!(r.recommendations.len(), 3);
    }

    #[test]
    fn method_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Method::RulesFallback).unwrap(), "\"rules_fallback\"");
        assert_eq!(Method::ErrorFallback.to_string(), "error_fallback");
    }

    #[test]
    fn optional_fields_are_omitted() {
        let r = TriageResult::safe_fallback(Method::Fallback, "failed", "boom");
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("severity_breakdown").is_none());
        assert!(v.get("medical_disclaimer").is_none());
        assert_eq!(v["method"], "fallback");
        assert_eq!(v["level"], "AMBER");
    }

    #[test]
    fn external_assessment_rationale_defaults_empty() {
        let a: ExternalAssessment =
            serde_json::from_str(r#"{"level": "RED", "confidence": 0.4}"#).unwrap();
        assert_eq!(a.level, TriageLevel::Red);
        assert!(a.rationale.is_empty());
    }
}
