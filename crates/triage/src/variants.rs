//! Lightweight assessment paths that bypass the rule classifier.
//!
//! None of these consult the policy store or the external assessor; each is
//! a fixed keyword policy over one input.

use chrono::{DateTime, Utc};
use orthoassist_core::{Detection, TriageLevel, Urgency};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lexicon::{
    contains_any, DEFORMITY_WORDS, INTENSITY_MILD_WORDS, INTENSITY_MODERATE_WORDS,
    INTENSITY_SEVERE_WORDS, QUICK_MODERATE_WORDS, QUICK_SEVERE_WORDS, SURFACE_SIGN_WORDS,
};

/// Free-form clinical findings, echoed back untouched.
pub type Findings = serde_json::Map<String, serde_json::Value>;

const DIAGNOSIS_SEVERE: &[&str] = &["compound", "open", "severe", "displaced"];
const DIAGNOSIS_FRACTURE: &[&str] = &["fracture", "break", "crack"];
const DIAGNOSIS_MINOR: &[&str] = &["possible", "minor", "hairline"];

// ── Diagnosis ───────────────────────────────────────────────────────

/// Upstream diagnosis summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnosis {
    #[serde(default)]
    pub primary_finding: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub body_part: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisTriage {
    pub level: TriageLevel,
    pub confidence: f64,
    pub recommendation: String,
    pub priority: Urgency,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_part: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Keyword policy over the diagnosis' primary finding. Without a finding,
/// the most confident detection stands in.
pub fn assess(detections: &[Detection], diagnosis: &Diagnosis) -> DiagnosisTriage {
    let strongest = detections
        .iter()
        .filter(|d| d.is_well_formed())
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

    let (finding, confidence) = match (&diagnosis.primary_finding, strongest) {
        (Some(f), _) if !f.trim().is_empty() => (f.clone(), diagnosis.confidence),
        (_, Some(d)) => (d.label.clone(), diagnosis.confidence.or(Some(d.confidence))),
        _ => (String::new(), diagnosis.confidence),
    };
    let confidence = sanitize(confidence.unwrap_or(0.0));

    let (level, priority, recommendation) = if contains_any(&finding, DIAGNOSIS_SEVERE) {
        (
            TriageLevel::Red,
            Urgency::Immediate,
            "Seek immediate emergency medical attention",
        )
    } else if contains_any(&finding, DIAGNOSIS_FRACTURE) && confidence > 0.6 {
        (
            TriageLevel::Amber,
            Urgency::Urgent,
            "Seek medical attention within 24-48 hours",
        )
    } else if contains_any(&finding, DIAGNOSIS_MINOR) {
        (
            TriageLevel::Green,
            Urgency::NonUrgent,
            "Schedule appointment with healthcare provider",
        )
    } else {
        (TriageLevel::Amber, Urgency::Moderate, "Consider medical evaluation")
    };

    let shown = if finding.is_empty() { "Unknown" } else { finding.as_str() };
    DiagnosisTriage {
        level,
        confidence: (confidence + 0.1).min(1.0),
        recommendation: recommendation.to_string(),
        priority,
        rationale: format!("Based on finding: {}", shown),
        body_part: diagnosis.body_part.clone(),
        timestamp: Utc::now(),
    }
}

// ── Quick ───────────────────────────────────────────────────────────

/// What is known about an uploaded image without decoding it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickTriage {
    pub level: TriageLevel,
    pub priority: Urgency,
    pub recommendation: String,
    pub confidence: f64,
    pub quick_assessment: bool,
    pub symptoms_provided: bool,
    pub image_received: bool,
}

pub fn quick_assess(image: &ImageDescriptor, symptoms: Option<&str>, priority: bool) -> QuickTriage {
    // Whitespace still counts as symptoms given.
    let symptoms = symptoms.filter(|s| !s.is_empty());
    debug!(
        image = image.name.as_deref().unwrap_or("unnamed"),
        content_type = image.content_type.as_deref().unwrap_or("unknown"),
        size_bytes = image.size_bytes,
        priority,
        "quick triage"
    );

    if priority {
        return QuickTriage {
            level: TriageLevel::Red,
            priority: Urgency::Immediate,
            recommendation: "Seek immediate emergency care".to_string(),
            confidence: 0.8,
            quick_assessment: true,
            symptoms_provided: symptoms.is_some(),
            image_received: image.size_bytes > 0,
        };
    }

    let (level, urgency) = match symptoms {
        Some(text) if contains_any(text, QUICK_SEVERE_WORDS) => (TriageLevel::Red, Urgency::Immediate),
        Some(text) if contains_any(text, QUICK_MODERATE_WORDS) => (TriageLevel::Amber, Urgency::Urgent),
        Some(_) => (TriageLevel::Green, Urgency::NonUrgent),
        None => (TriageLevel::Amber, Urgency::Moderate),
    };

    QuickTriage {
        level,
        priority: urgency,
        recommendation: format!("Based on quick assessment: {} priority", level),
        confidence: 0.6,
        quick_assessment: true,
        symptoms_provided: symptoms.is_some(),
        image_received: image.size_bytes > 0,
    }
}

// ── Symptoms ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomTriage {
    pub level: TriageLevel,
    pub priority: Urgency,
    pub confidence: f64,
    /// Raw points after the age multiplier.
    pub severity_score: f64,
    pub age_factor: f64,
    pub recommendation: String,
    pub findings: Findings,
}

/// Age multiplier: elderly 1.2, minors 1.1.
pub fn age_factor(age: Option<u32>) -> f64 {
    match age {
        // Zero reads as unknown.
        Some(0) | None => 1.0,
        Some(a) if a > 65 => 1.2,
        Some(a) if a < 18 => 1.1,
        Some(_) => 1.0,
    }
}

/// Unweighted symptom points.
pub fn symptom_points(symptoms: &str) -> u32 {
    let mut points = if contains_any(symptoms, INTENSITY_SEVERE_WORDS) {
        3
    } else if contains_any(symptoms, INTENSITY_MODERATE_WORDS) {
        2
    } else if contains_any(symptoms, INTENSITY_MILD_WORDS) {
        1
    } else {
        0
    };
    if contains_any(symptoms, DEFORMITY_WORDS) {
        points += 3;
    }
    if contains_any(symptoms, SURFACE_SIGN_WORDS) {
        points += 1;
    }
    points
}

pub fn assess_from_symptoms(symptoms: &str, findings: &Findings, age: Option<u32>) -> SymptomTriage {
    let points = symptom_points(symptoms);
    let factor = age_factor(age);
    let score = f64::from(points) * factor;

    let level = if score >= 4.0 {
        TriageLevel::Red
    } else if score >= 2.0 {
        TriageLevel::Amber
    } else {
        TriageLevel::Green
    };
    let priority = level.urgency();

    SymptomTriage {
        level,
        priority,
        confidence: (0.4 + 0.1 * f64::from(points)).min(0.7),
        severity_score: score,
        age_factor: factor,
        recommendation: format!("Triage level {} based on symptom assessment", level),
        findings: findings.clone(),
    }
}

fn sanitize(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnosis(finding: &str, confidence: f64) -> Diagnosis {
        Diagnosis {
            primary_finding: Some(finding.to_string()),
            confidence: Some(confidence),
            body_part: Some("hand".to_string()),
        }
    }

    // ── assess ──────────────────────────────────────────────────────

    #[test]
    fn displaced_finding_is_immediate() {
        let r = assess(&[], &diagnosis("Displaced radius fracture", 0.7));
        assert_eq!(r.level, TriageLevel::Red);
        assert_eq!(r.priority, Urgency::Immediate);
        assert!((r.confidence - 0.8).abs() < 1e-9);
        assert_eq!(r.rationale, "Based on finding: Displaced radius fracture");
        assert_eq!(r.body_part.as_deref(), Some("hand"));
    }

    #[test]
    fn fracture_needs_confidence_for_urgent() {
        let sure = assess(&[], &diagnosis("fracture", 0.65));
        assert_eq!((sure.level, sure.priority), (TriageLevel::Amber, Urgency::Urgent));

        let unsure = assess(&[], &diagnosis("fracture", 0.4));
        assert_eq!((unsure.level, unsure.priority), (TriageLevel::Amber, Urgency::Moderate));
    }

    #[test]
    fn hairline_is_non_urgent_when_unsure() {
        let r = assess(&[], &diagnosis("hairline fracture", 0.5));
        assert_eq!(r.level, TriageLevel::Green);
        assert_eq!(r.priority, Urgency::NonUrgent);
    }

    #[test]
    fn confidence_capped_at_one() {
        assert_eq!(assess(&[], &diagnosis("open fracture", 0.95)).confidence, 1.0);
    }

    #[test]
    fn strongest_detection_stands_in_for_missing_finding() {
        let detections = vec![
            Detection::new("sprain", 0.4),
            Detection::new("Compound fracture", 0.9),
        ];
        let r = assess(&detections, &Diagnosis::default());
        assert_eq!(r.level, TriageLevel::Red);
        assert!((r.confidence - 1.0).abs() < 1e-9);
        assert_eq!(r.rationale, "Based on finding: Compound fracture");
    }

    #[test]
    fn nothing_known_is_moderate() {
        let r = assess(&[], &Diagnosis::default());
        assert_eq!(r.level, TriageLevel::Amber);
        assert_eq!(r.priority, Urgency::Moderate);
        assert_eq!(r.rationale, "Based on finding: Unknown");
        assert!((r.confidence - 0.1).abs() < 1e-9);
    }

    // ── quick_assess ────────────────────────────────────────────────

    #[test]
    fn priority_forces_red() {
        let image = ImageDescriptor {
            size_bytes: 1024,
            ..ImageDescriptor::default()
        };
        let r = quick_assess(&image, Some("mild ache"), true);
        assert_eq!(r.level, TriageLevel::Red);
        assert_eq!(r.priority, Urgency::Immediate);
        assert_eq!(r.confidence, 0.8);
        assert!(r.image_received);
    }

    #[test]
    fn quick_symptom_words() {
        let image = ImageDescriptor::default();
        assert_eq!(quick_assess(&image, Some("Unbearable pain"), false).level, TriageLevel::Red);
        assert_eq!(
            quick_assess(&image, Some("significant swelling"), false).priority,
            Urgency::Urgent
        );
        let mild = quick_assess(&image, Some("itchy"), false);
        assert_eq!(mild.level, TriageLevel::Green);
        assert_eq!(mild.recommendation, "Based on quick assessment: GREEN priority");
        assert_eq!(mild.confidence, 0.6);
    }

    #[test]
    fn quick_without_symptoms_is_moderate() {
        for symptoms in [None, Some("")] {
            let r = quick_assess(&ImageDescriptor::default(), symptoms, false);
            assert_eq!(r.level, TriageLevel::Amber);
            assert_eq!(r.priority, Urgency::Moderate);
            assert!(!r.symptoms_provided);
            assert!(!r.image_received);
        }
    }

    #[test]
    fn quick_blank_symptoms_still_count_as_given() {
        let image = ImageDescriptor {
            name: Some("wrist.png".into()),
            content_type: Some("image/png".into()),
            size_bytes: 10,
        };
        let r = quick_assess(&image, Some("   "), false);
        assert_eq!(r.level, TriageLevel::Green);
        assert_eq!(r.priority, Urgency::NonUrgent);
        assert!(r.symptoms_provided);
    }

    // ── assess_from_symptoms ────────────────────────────────────────

    #[test]
    fn elderly_severe_deformity_is_red() {
        let r = assess_from_symptoms("severe deformed pain", &Findings::new(), Some(70));
        assert!((r.severity_score - 7.2).abs() < 1e-9);
        assert_eq!(r.age_factor, 1.2);
        assert_eq!(r.level, TriageLevel::Red);
        assert_eq!(r.priority, Urgency::Immediate);
        assert_eq!(r.confidence, 0.7);
    }

    #[test]
    fn child_multiplier_crosses_amber() {
        // mild + swelling = 2 points; ×1.1 for minors
        let r = assess_from_symptoms("mild swelling", &Findings::new(), Some(9));
        assert!((r.severity_score - 2.2).abs() < 1e-9);
        assert_eq!(r.level, TriageLevel::Amber);
        assert!((r.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn age_zero_is_treated_as_unknown() {
        assert_eq!(age_factor(Some(0)), 1.0);
        assert_eq!(age_factor(Some(1)), 1.1);
        let r = assess_from_symptoms("mild swelling", &Findings::new(), Some(0));
        assert_eq!(r.age_factor, 1.0);
        assert_eq!(r.severity_score, 2.0);
    }

    #[test]
    fn no_signals_is_green() {
        let r = assess_from_symptoms("feels odd", &Findings::new(), None);
        assert_eq!(r.severity_score, 0.0);
        assert_eq!(r.level, TriageLevel::Green);
        assert!((r.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn intensity_words_do_not_stack() {
        assert_eq!(symptom_points("severe and significant"), 3);
        assert_eq!(symptom_points("slight bruising, bent finger"), 5);
    }

    #[test]
    fn findings_echoed_back() {
        let mut findings = Findings::new();
        findings.insert("xray".into(), serde_json::json!("pending"));
        let r = assess_from_symptoms("mild", &findings, Some(40));
        assert_eq!(r.findings, findings);
        assert_eq!(r.age_factor, 1.0);
    }
}
