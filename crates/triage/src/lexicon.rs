//! Fixed keyword sets for free-text symptom matching.
//!
//! All matching is case-insensitive substring search; empty text matches
//! nothing.

/// Phrases signalling deformity, bleeding, neurological compromise,
/// inability to bear weight or extreme pain.
pub const SEVERE_SYMPTOMS: &[&str] = &[
    "severe pain",
    "intense pain",
    "unbearable",
    "excruciating",
    "deformity",
    "bone visible",
    "bleeding",
    "numbness",
    "tingling",
    "can't move",
    "unable to bear weight",
];

pub const MODERATE_SYMPTOMS: &[&str] = &[
    "pain",
    "swelling",
    "bruising",
    "stiffness",
    "difficulty moving",
    "tender",
    "sore",
];

// Word sets for the quick and symptom-scored assessment variants.

pub(crate) const QUICK_SEVERE_WORDS: &[&str] = &["severe", "intense", "unbearable", "emergency"];
pub(crate) const QUICK_MODERATE_WORDS: &[&str] = &["moderate", "significant", "concerning"];

pub(crate) const INTENSITY_SEVERE_WORDS: &[&str] = &["severe", "excruciating", "unbearable"];
pub(crate) const INTENSITY_MODERATE_WORDS: &[&str] = &["moderate", "significant"];
pub(crate) const INTENSITY_MILD_WORDS: &[&str] = &["mild", "slight"];
pub(crate) const DEFORMITY_WORDS: &[&str] = &["deformed", "bent", "crooked", "displaced"];
pub(crate) const SURFACE_SIGN_WORDS: &[&str] = &["swelling", "bruising", "discoloration"];

/// True when the lowercased text contains any of `keywords`.
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

pub fn has_severe(text: &str) -> bool {
    contains_any(text, SEVERE_SYMPTOMS)
}

pub fn has_moderate(text: &str) -> bool {
    contains_any(text, MODERATE_SYMPTOMS)
}
