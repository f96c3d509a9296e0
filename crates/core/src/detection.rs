use serde::{Deserialize, Serialize};

/// A labeled, confidence-scored finding from an upstream image model.
///
/// Upstream models disagree on field names: the label may arrive as
/// `label` or `class`, the score as `confidence` or `score`. When both
/// score fields are present `confidence` wins; when neither is, the
/// score is 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDetection")]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
}

#[derive(Deserialize)]
struct RawDetection {
    #[serde(default, alias = "class")]
    label: Option<Lenient<String>>,
    #[serde(default)]
    confidence: Option<Lenient<f64>>,
    #[serde(default)]
    score: Option<Lenient<f64>>,
}

/// A field that keeps deserializing when the upstream sends the wrong type.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(serde::de::IgnoredAny),
}

impl From<RawDetection> for Detection {
    /// A mistyped score becomes NaN so the entry is rejected as malformed
    /// downstream instead of failing the whole request.
    fn from(raw: RawDetection) -> Self {
        let label = match raw.label {
            Some(Lenient::Valid(label)) => label,
            _ => String::new(),
        };
        let confidence = match raw.confidence.or(raw.score) {
            Some(Lenient::Valid(c)) => c,
            Some(Lenient::Invalid(_)) => f64::NAN,
            None => 0.0,
        };
        Self { label, confidence }
    }
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Lowercased label with spaces and hyphens removed, the form that
    /// policy patterns are matched against.
    pub fn normalized_label(&self) -> String {
        normalize_label(&self.label)
    }

    /// Confidence is a finite number in [0, 1].
    pub fn is_well_formed(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Normalize a label or pattern for substring matching.
pub fn normalize_label(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}
