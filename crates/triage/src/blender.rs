//! Merge of the rule outcome with an external assessment.

use orthoassist_core::{ExternalAssessment, Method, SubAssessment, TriageLevel, TriageResult};

use crate::classifier::RuleOutcome;

/// Blended opinion, carrying both inputs for audit.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendedAssessment {
    pub level: TriageLevel,
    pub confidence: f64,
    pub rationale: Vec<String>,
    pub rule_assessment: SubAssessment,
    pub external_assessment: SubAssessment,
}

impl BlendedAssessment {
    /// Final result for the blended level. Detection-derived fields are
    /// kept from the rule outcome.
    pub fn into_result(self, rule: RuleOutcome) -> TriageResult {
        TriageResult {
            level: self.level,
            confidence: self.confidence,
            rationale: self.rationale,
            recommendations: self.level.default_recommendations(),
            method: Method::Combined,
            partial: false,
            error: None,
            inference_time_ms: 0.0,
            max_detection_score: rule.max_detection_score,
            severity_breakdown: rule.severity_breakdown,
            rule_assessment: Some(self.rule_assessment),
            external_assessment: Some(self.external_assessment),
            medical_disclaimer: None,
        }
    }
}

/// Higher-priority level wins, ties go to the rules. Agreement raises
/// confidence by 0.1 over the mean (capped at 1.0); disagreement scales the
/// larger confidence by 0.8.
pub fn blend(rule: &RuleOutcome, external: &ExternalAssessment) -> BlendedAssessment {
    let rule_wins = rule.level.priority() >= external.level.priority();

    let (level, primary, secondary) = if rule_wins {
        (rule.level, &rule.rationale, &external.rationale)
    } else {
        (external.level, &external.rationale, &rule.rationale)
    };

    let mut rationale = primary.clone();
    for reason in secondary {
        if !rationale.contains(reason) {
            rationale.push(reason.clone());
        }
    }

    let confidence = if rule.level == external.level {
        ((rule.confidence + external.confidence) / 2.0 + 0.1).min(1.0)
    } else {
        rule.confidence.max(external.confidence) * 0.8
    };

    BlendedAssessment {
        level,
        confidence: confidence.clamp(0.0, 1.0),
        rationale,
        rule_assessment: SubAssessment {
            level: rule.level,
            confidence: rule.confidence,
        },
        external_assessment: SubAssessment {
            level: external.level,
            confidence: external.confidence,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(level: TriageLevel, confidence: f64, rationale: &[&str]) -> RuleOutcome {
        RuleOutcome {
            level,
            confidence,
            rationale: rationale.iter().map(|s| s.to_string()).collect(),
            recommendations: level.default_recommendations(),
            max_detection_score: Some(confidence),
            severity_breakdown: None,
        }
    }

    fn external(level: TriageLevel, confidence: f64, rationale: &[&str]) -> ExternalAssessment {
        ExternalAssessment {
            level,
            confidence,
            rationale: rationale.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn higher_priority_wins_regardless_of_confidence() {
        let b = blend(
            &rule(TriageLevel::Green, 0.9, &["rule"]),
            &external(TriageLevel::Red, 0.5, &["llm"]),
        );
        assert_eq!(b.level, TriageLevel::Red);
        assert!((b.confidence - 0.72).abs() < 1e-9);
        assert_eq!(b.rationale, vec!["llm", "rule"]);
    }

    #[test]
    fn agreement_rewards_confidence() {
        let b = blend(
            &rule(TriageLevel::Amber, 0.6, &[]),
            &external(TriageLevel::Amber, 0.8, &[]),
        );
        assert_eq!(b.level, TriageLevel::Amber);
        assert!((b.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn agreement_is_capped_at_one() {
        let b = blend(
            &rule(TriageLevel::Red, 0.98, &[]),
            &external(TriageLevel::Red, 0.99, &[]),
        );
        assert_eq!(b.confidence, 1.0);
    }

    #[test]
    fn tie_goes_to_rules_and_dedups_rationale() {
        let b = blend(
            &rule(TriageLevel::Amber, 0.5, &["a", "b"]),
            &external(TriageLevel::Amber, 0.5, &["b", "c", "a", "c"]),
        );
        assert_eq!(b.rationale, vec!["a", "b", "c"]);
    }

    #[test]
    fn lower_external_level_loses() {
        let b = blend(
            &rule(TriageLevel::Red, 0.4, &["rule"]),
            &external(TriageLevel::Green, 0.95, &["llm"]),
        );
        assert_eq!(b.level, TriageLevel::Red);
        assert!((b.confidence - 0.76).abs() < 1e-9);
        assert_eq!(b.rationale, vec!["rule", "llm"]);
    }

    #[test]
    fn both_sources_kept_for_audit() {
        let b = blend(
            &rule(TriageLevel::Green, 0.3, &[]),
            &external(TriageLevel::Amber, 0.6, &[]),
        );
        assert_eq!(b.rule_assessment.level, TriageLevel::Green);
        assert_eq!(b.rule_assessment.confidence, 0.3);
        assert_eq!(b.external_assessment.level, TriageLevel::Amber);

        let r = b.into_result(rule(TriageLevel::Green, 0.3, &[]));
        assert_eq!(r.method, Method::Combined);
        assert_eq!(r.recommendations, TriageLevel::Amber.default_recommendations());
        assert!(r.rule_assessment.is_some() && r.external_assessment.is_some());
    }
}
