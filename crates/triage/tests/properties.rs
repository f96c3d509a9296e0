//! End-to-end behavioural checks of the triage pipeline through the public
//! API: safety of the top-level contract, rule outcomes for the reference
//! scenarios, and blending.

use std::sync::Arc;

use async_trait::async_trait;
use orthoassist_core::{
    Detection, ExternalAssessment, Method, TriageError, TriageLevel, MEDICAL_DISCLAIMER,
};
use orthoassist_triage::blender::blend;
use orthoassist_triage::classifier::{RuleClassifier, RuleOutcome};
use orthoassist_triage::variants::Findings;
use orthoassist_triage::{
    EngineSettings, ExternalAssessor, InMemoryPolicyStore, TriageConfig, TriageEngine,
};

fn engine() -> TriageEngine {
    TriageEngine::new(Arc::new(InMemoryPolicyStore::builtin()), EngineSettings::default())
}

struct Echo(TriageLevel, f64);

#[async_trait]
impl ExternalAssessor for Echo {
    async fn generate_assessment(
        &self,
        _detections: &[Detection],
        _symptoms: Option<&str>,
        _body_part: Option<&str>,
    ) -> Result<ExternalAssessment, TriageError> {
        Ok(ExternalAssessment {
            level: self.0,
            confidence: self.1,
            rationale: vec!["external".into()],
        })
    }

    fn name(&self) -> &str {
        "echo"
    }
}

fn rule(level: TriageLevel, confidence: f64) -> RuleOutcome {
    RuleOutcome {
        level,
        confidence,
        rationale: vec!["rule".into()],
        recommendations: level.default_recommendations(),
        max_detection_score: Some(confidence),
        severity_breakdown: None,
    }
}

// ── Top-level contract ──────────────────────────────────────────────

#[tokio::test]
async fn every_input_yields_a_bounded_result() {
    let labels = [
        "compound fracture",
        "Hairline-Fracture",
        "sprain",
        "",
        "???",
        "open dislocation",
        "negative",
    ];
    let confidences = [0.0, 0.01, 0.3, 0.5, 0.8, 0.85, 1.0, f64::NAN, -0.2, 3.0];
    let symptoms = [None, Some(""), Some("severe pain"), Some("swelling"), Some("fine")];

    let engines = [
        engine(),
        engine().with_assessor(Arc::new(Echo(TriageLevel::Red, 0.9))),
        engine().with_assessor(Arc::new(Echo(TriageLevel::Green, f64::NAN))),
    ];

    for engine in &engines {
        for label in labels {
            for confidence in confidences {
                for symptom in symptoms {
                    let detections = vec![
                        Detection::new(label, confidence),
                        Detection::new("fracture", 0.6),
                    ];
                    let r = engine
                        .process_triage_request(&detections, symptom, Some("leg"), false, None)
                        .await;
                    assert!(
                        (0.0..=1.0).contains(&r.confidence),
                        "confidence {} out of range for {:?}/{}",
                        r.confidence,
                        label,
                        confidence
                    );
                    assert!(TriageLevel::ALL.contains(&r.level));
                    assert_eq!(r.medical_disclaimer.as_deref(), Some(MEDICAL_DISCLAIMER));
                    assert!(r.inference_time_ms >= 0.0);
                    if r.error.is_some() {
                        assert!(r.partial);
                    }
                }
            }
        }
    }
}

#[tokio::test]
async fn no_detections_no_symptoms_is_green_at_default() {
    let r = engine()
        .process_triage_request(&[], None, None, false, None)
        .await;
    assert_eq!(r.level, TriageLevel::Green);
    assert_eq!(r.confidence, TriageConfig::default().no_detection_confidence);
}

#[tokio::test]
async fn no_detections_severe_pain_is_amber() {
    let r = engine()
        .process_triage_request(&[], Some("severe pain in the ankle"), None, false, None)
        .await;
    assert_eq!(r.level, TriageLevel::Amber);
}

#[tokio::test]
async fn confident_compound_fracture_is_red_by_rules() {
    let r = engine()
        .process_triage_request(
            &[Detection::new("compound fracture", 0.9)],
            None,
            Some("hand"),
            false,
            None,
        )
        .await;
    assert_eq!(r.level, TriageLevel::Red);
    assert_eq!(r.method, Method::Rules);
    assert_eq!(r.recommendations, TriageLevel::Red.default_recommendations());
    assert!(r.severity_breakdown.is_some());
}

#[tokio::test]
async fn unsure_compound_fracture_stays_amber() {
    let r = engine()
        .process_triage_request(&[Detection::new("compound fracture", 0.6)], None, None, false, None)
        .await;
    assert_eq!(r.level, TriageLevel::Amber);
}

#[tokio::test]
async fn three_weak_minor_findings_escalate() {
    let detections = vec![
        Detection::new("hairline fracture", 0.3),
        Detection::new("sprain", 0.3),
        Detection::new("bruise", 0.3),
    ];
    let r = engine()
        .process_triage_request(&detections, None, None, false, None)
        .await;
    assert_eq!(r.level, TriageLevel::Amber);
}

// ── Determinism ─────────────────────────────────────────────────────

#[test]
fn classifier_is_idempotent() {
    let config = TriageConfig::default();
    let classifier = RuleClassifier::new(&config);
    let detections = vec![
        Detection::new("displaced fracture", 0.77),
        Detection::new("soft tissue swelling", 0.41),
    ];
    let a = classifier
        .classify(&detections, Some("tender"), Some("leg"))
        .unwrap();
    let b = classifier
        .classify(&detections, Some("tender"), Some("leg"))
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_vec(&a.clone().into_result(Method::Rules)).unwrap(),
        serde_json::to_vec(&b.into_result(Method::Rules)).unwrap()
    );
}

// ── Blending ────────────────────────────────────────────────────────

#[test]
fn priority_beats_confidence() {
    let external = ExternalAssessment {
        level: TriageLevel::Red,
        confidence: 0.5,
        rationale: vec![],
    };
    let b = blend(&rule(TriageLevel::Green, 0.9), &external);
    assert_eq!(b.level, TriageLevel::Red);
    // larger confidence scaled by the disagreement factor
    assert!((b.confidence - 0.72).abs() < 1e-9);
}

#[test]
fn agreement_adds_a_tenth() {
    let external = ExternalAssessment {
        level: TriageLevel::Amber,
        confidence: 0.8,
        rationale: vec![],
    };
    let b = blend(&rule(TriageLevel::Amber, 0.6), &external);
    assert!((b.confidence - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn low_confidence_request_is_combined() {
    let engine = engine().with_assessor(Arc::new(Echo(TriageLevel::Amber, 0.8)));
    let r = engine
        .process_triage_request(&[Detection::new("fracture", 0.55)], None, None, false, None)
        .await;
    assert_eq!(r.method, Method::Combined);
    assert_eq!(r.level, TriageLevel::Amber);
    assert!(r.rationale.contains(&"external".to_string()));
    assert!(!r.partial);
}

// ── Variants ────────────────────────────────────────────────────────

#[test]
fn elderly_symptom_scoring() {
    let r = engine().assess_from_symptoms("severe deformed pain", &Findings::new(), Some(70));
    assert!((r.severity_score - 7.2).abs() < 1e-9);
    assert_eq!(r.age_factor, 1.2);
    assert_eq!(r.level, TriageLevel::Red);
    assert_eq!(r.priority.to_string(), "immediate");
}
