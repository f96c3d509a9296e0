//! Rule-based R/A/G classifier.
//!
//! Combines bucket scores, max confidence, detection count and the symptom
//! signal into one level, a confidence and a rationale. Deterministic: the
//! same detections, symptoms and config always produce the same outcome.

use orthoassist_core::{Detection, Method, SeverityBreakdown, TriageError, TriageLevel, TriageResult};
use tracing::debug;

use crate::lexicon;
use crate::policy::{matches_any, TriageConfig};
use crate::scorer::{score_detections, SeverityScores};

/// Output of the rule layer, before the orchestrator picks a method.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub level: TriageLevel,
    pub confidence: f64,
    pub rationale: Vec<String>,
    pub recommendations: Vec<String>,
    /// Max detection confidence after the high-confidence boost.
    pub max_detection_score: Option<f64>,
    pub severity_breakdown: Option<SeverityBreakdown>,
}

impl RuleOutcome {
    pub fn into_result(self, method: Method) -> TriageResult {
        TriageResult {
            level: self.level,
            confidence: self.confidence,
            rationale: self.rationale,
            recommendations: self.recommendations,
            method,
            partial: false,
            error: None,
            inference_time_ms: 0.0,
            max_detection_score: self.max_detection_score,
            severity_breakdown: self.severity_breakdown,
            rule_assessment: None,
            external_assessment: None,
            medical_disclaimer: None,
        }
    }
}

pub struct RuleClassifier<'a> {
    config: &'a TriageConfig,
}

impl<'a> RuleClassifier<'a> {
    pub fn new(config: &'a TriageConfig) -> Self {
        Self { config }
    }

    /// Classify one request.
    ///
    /// # Errors
    ///
    /// [`TriageError::Fault`] when a detection carries a confidence that is
    /// not a finite number in [0, 1].
    pub fn classify(
        &self,
        detections: &[Detection],
        symptoms: Option<&str>,
        body_part: Option<&str>,
    ) -> Result<RuleOutcome, TriageError> {
        if let Some(bad) = detections.iter().find(|d| !d.is_well_formed()) {
            return Err(TriageError::Fault(format!(
                "malformed detection '{}': confidence {} outside [0, 1]",
                bad.label, bad.confidence
            )));
        }

        let symptoms = symptoms.unwrap_or("");
        debug!(
            detections = detections.len(),
            body_part = body_part.unwrap_or("unspecified"),
            "applying triage rules"
        );

        if detections.is_empty() {
            return Ok(self.classify_without_detections(symptoms));
        }

        let cfg = self.config;
        let scores = score_detections(detections, cfg);
        let mut rationale = scores.rationale.clone();
        let mut level = base_level(&scores, cfg);

        level = escalate_for_count(level, detections.len(), &mut rationale);

        let high_confidence = detections
            .iter()
            .filter(|d| d.confidence > cfg.high_confidence_threshold)
            .count();
        let boost = high_confidence as f64 * cfg.confidence_boost_per_detection;
        let boosted_confidence = (scores.max_confidence + boost).min(1.0);

        if lexicon::has_severe(symptoms) {
            if level == TriageLevel::Green {
                level = TriageLevel::Amber;
            }
            rationale.push("Severe symptoms reported".to_string());
        } else if lexicon::has_moderate(symptoms) {
            rationale.push("Moderate symptoms reported".to_string());
        }

        if rationale.is_empty() {
            rationale.push(format!("Assessment based on {} detection(s)", detections.len()));
        }

        let rule_confidence = rule_confidence(detections, &scores, level, boosted_confidence, cfg);
        let confidence = combined_confidence(rule_confidence, Some(boosted_confidence), cfg);

        Ok(RuleOutcome {
            level,
            confidence,
            rationale,
            recommendations: level.default_recommendations(),
            max_detection_score: Some(boosted_confidence),
            severity_breakdown: Some(scores.breakdown()),
        })
    }

    fn classify_without_detections(&self, symptoms: &str) -> RuleOutcome {
        let (level, confidence, rationale) = if lexicon::has_severe(symptoms) {
            (
                TriageLevel::Amber,
                self.config.no_detection_severe_symptoms_confidence,
                vec!["No fractures detected but concerning symptoms reported".to_string()],
            )
        } else {
            (
                TriageLevel::Green,
                self.config.no_detection_confidence,
                vec![
                    "No fractures detected".to_string(),
                    "No concerning symptoms".to_string(),
                ],
            )
        };
        RuleOutcome {
            level,
            confidence,
            rationale,
            recommendations: level.default_recommendations(),
            max_detection_score: None,
            severity_breakdown: None,
        }
    }
}

/// Level implied by the strongest bucket and the max detection confidence.
fn base_level(scores: &SeverityScores, cfg: &TriageConfig) -> TriageLevel {
    let max = scores.max_confidence;
    if scores.score(TriageLevel::Red) > 0.0 {
        // RED evidence never drops below AMBER.
        if max >= cfg.red_threshold {
            TriageLevel::Red
        } else {
            TriageLevel::Amber
        }
    } else if scores.score(TriageLevel::Amber) > 0.0 {
        if max >= cfg.red_threshold {
            TriageLevel::Red
        } else if max >= cfg.amber_threshold {
            TriageLevel::Amber
        } else {
            TriageLevel::Green
        }
    } else if max >= cfg.amber_threshold {
        // GREEN evidence is capped at AMBER however confident.
        TriageLevel::Amber
    } else {
        TriageLevel::Green
    }
}

fn escalate_for_count(level: TriageLevel, count: usize, rationale: &mut Vec<String>) -> TriageLevel {
    if count >= 3 {
        if level == TriageLevel::Red {
            return level;
        }
        rationale.push("Multiple fractures detected".to_string());
        if level == TriageLevel::Green {
            TriageLevel::Amber
        } else {
            TriageLevel::Red
        }
    } else if count == 2 && level == TriageLevel::Green {
        rationale.push("Multiple injuries detected".to_string());
        TriageLevel::Amber
    } else {
        level
    }
}

/// Confidence derived purely from the rule layer.
///
/// Mean of the average detection score and `boosted_confidence`, plus
/// `consistency_boost` (and 0.05 more for RED) when more than
/// `consistency_threshold` of the detections match the chosen level's
/// patterns, minus `mixed_severity_penalty` when detections landed in more
/// than one bucket.
pub fn rule_confidence(
    detections: &[Detection],
    scores: &SeverityScores,
    level: TriageLevel,
    boosted_confidence: f64,
    cfg: &TriageConfig,
) -> f64 {
    if detections.is_empty() {
        return cfg.no_detection_rule_confidence;
    }

    let total = detections.len() as f64;
    let average = detections.iter().map(|d| d.confidence).sum::<f64>() / total;
    let mut confidence = (average + boosted_confidence) / 2.0;

    let patterns = match level {
        TriageLevel::Red => &cfg.red_patterns,
        TriageLevel::Amber => &cfg.amber_patterns,
        TriageLevel::Green => &cfg.green_patterns,
    };
    let consistent = detections
        .iter()
        .filter(|d| matches_any(&d.normalized_label(), patterns))
        .count() as f64;
    if consistent / total > cfg.consistency_threshold {
        confidence += cfg.consistency_boost;
        if level == TriageLevel::Red {
            confidence += 0.05;
        }
    }

    // Exclusive scorer buckets, unlike the per-pattern-set count above.
    if scores.populated_buckets() > 1 {
        confidence -= cfg.mixed_severity_penalty;
    }

    confidence.clamp(0.0, 1.0)
}

/// Reported confidence: mean of the rule confidence and the boosted
/// detection confidence, with the config default standing in for the
/// latter when there is none.
pub fn combined_confidence(rule_confidence: f64, boosted: Option<f64>, cfg: &TriageConfig) -> f64 {
    let from_detections = boosted.unwrap_or(cfg.default_confidence);
    ((rule_confidence + from_detections) / 2.0).clamp(0.0, 1.0)
}
