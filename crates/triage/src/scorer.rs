//! Detection severity scoring.
//!
//! Each detection label is normalized and bucketed RED / AMBER / GREEN by
//! pattern membership, tested in the order RED → GREEN → AMBER. Labels that
//! match nothing count as AMBER. Bucket scores are confidence-weighted sums.

use orthoassist_core::{Detection, SeverityBreakdown, TriageLevel};

use crate::policy::{matches_any, TriageConfig};

/// How a single label was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelCategory {
    Severe,
    Minor,
    Moderate,
    /// Matched no pattern; scored as AMBER.
    Unrecognized,
}

impl LabelCategory {
    pub fn bucket(self) -> TriageLevel {
        match self {
            LabelCategory::Severe => TriageLevel::Red,
            LabelCategory::Minor => TriageLevel::Green,
            LabelCategory::Moderate | LabelCategory::Unrecognized => TriageLevel::Amber,
        }
    }

    fn rationale(self, label: &str, confidence: f64) -> String {
        let prefix = match self {
            LabelCategory::Severe => "Severe injury",
            LabelCategory::Minor => "Minor injury",
            LabelCategory::Moderate => "Moderate injury",
            LabelCategory::Unrecognized => "Injury",
        };
        format!("{} detected: {} (confidence: {:.2})", prefix, label, confidence)
    }
}

/// Classify a normalized label. RED is tested before GREEN before AMBER.
pub fn categorize(normalized_label: &str, config: &TriageConfig) -> LabelCategory {
    if matches_any(normalized_label, &config.red_patterns) {
        LabelCategory::Severe
    } else if matches_any(normalized_label, &config.green_patterns) {
        LabelCategory::Minor
    } else if matches_any(normalized_label, &config.amber_patterns) {
        LabelCategory::Moderate
    } else {
        LabelCategory::Unrecognized
    }
}

/// One value per severity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerLevel<T> {
    pub red: T,
    pub amber: T,
    pub green: T,
}

impl<T: Copy> PerLevel<T> {
    pub fn get(&self, level: TriageLevel) -> T {
        match level {
            TriageLevel::Red => self.red,
            TriageLevel::Amber => self.amber,
            TriageLevel::Green => self.green,
        }
    }

    pub fn get_mut(&mut self, level: TriageLevel) -> &mut T {
        match level {
            TriageLevel::Red => &mut self.red,
            TriageLevel::Amber => &mut self.amber,
            TriageLevel::Green => &mut self.green,
        }
    }
}

/// Accumulated evidence across all detections of one request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeverityScores {
    /// Confidence-weighted sum per bucket.
    pub weighted: PerLevel<f64>,
    /// Detection count per bucket.
    pub counts: PerLevel<usize>,
    pub max_confidence: f64,
    /// One line per detection, in input order.
    pub rationale: Vec<String>,
}

impl SeverityScores {
    pub fn score(&self, level: TriageLevel) -> f64 {
        self.weighted.get(level)
    }

    /// Number of buckets that received at least one detection.
    pub fn populated_buckets(&self) -> usize {
        TriageLevel::ALL
            .iter()
            .filter(|l| self.counts.get(**l) > 0)
            .count()
    }

    pub fn breakdown(&self) -> SeverityBreakdown {
        let total = self.counts.red + self.counts.amber + self.counts.green;
        SeverityBreakdown {
            red_score: self.weighted.red,
            amber_score: self.weighted.amber,
            green_score: self.weighted.green,
            total_weighted_score: if total > 0 {
                self.weighted.red * 3.0 + self.weighted.amber * 2.0 + self.weighted.green
            } else {
                0.0
            },
        }
    }
}

/// Score all detections against the config's pattern lists.
pub fn score_detections(detections: &[Detection], config: &TriageConfig) -> SeverityScores {
    let mut scores = SeverityScores::default();
    for detection in detections {
        let category = categorize(&detection.normalized_label(), config);
        let bucket = category.bucket();

        *scores.weighted.get_mut(bucket) += detection.confidence;
        *scores.counts.get_mut(bucket) += 1;
        scores
            .rationale
            .push(category.rationale(&detection.label, detection.confidence));

        if detection.confidence > scores.max_confidence {
            scores.max_confidence = detection.confidence;
        }
    }
    scores
}
