use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Urgency tier. Variants are declared in ascending priority so the
/// derived `Ord` matches RED > AMBER > GREEN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriageLevel {
    Green,
    Amber,
    Red,
}

impl TriageLevel {
    pub const ALL: [TriageLevel; 3] = [TriageLevel::Red, TriageLevel::Amber, TriageLevel::Green];

    /// Tie-break priority used when two opinions disagree.
    pub fn priority(self) -> u8 {
        match self {
            TriageLevel::Red => 3,
            TriageLevel::Amber => 2,
            TriageLevel::Green => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriageLevel::Red => "RED",
            TriageLevel::Amber => "AMBER",
            TriageLevel::Green => "GREEN",
        }
    }

    /// Care-seeking urgency label for this tier.
    pub fn urgency(self) -> Urgency {
        match self {
            TriageLevel::Red => Urgency::Immediate,
            TriageLevel::Amber => Urgency::Urgent,
            TriageLevel::Green => Urgency::NonUrgent,
        }
    }

    /// Fixed three-item recommendation list for this tier.
    pub fn default_recommendations(self) -> Vec<String> {
        let items: [&str; 3] = match self {
            TriageLevel::Red => [
                "Seek urgent medical attention (ER/urgent care)",
                "Immobilize the affected area and avoid weight bearing",
                "Bring imaging and reports to the appointment",
            ],
            TriageLevel::Amber => [
                "Schedule an appointment within 24-48 hours",
                "Limit activity and consider immobilization until evaluated",
                "Use pain control as advised by a clinician",
            ],
            TriageLevel::Green => [
                "Consider routine follow-up if symptoms persist",
                "Resume activities as tolerated and monitor for worsening",
                "Seek care if pain, numbness, or function worsens",
            ],
        };
        items.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriageLevel {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RED" => Ok(TriageLevel::Red),
            "AMBER" => Ok(TriageLevel::Amber),
            "GREEN" => Ok(TriageLevel::Green),
            other => Err(format!("unknown triage level: '{}'", other)),
        }
    }
}

/// Priority label attached to the simpler assessment variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Immediate,
    Urgent,
    /// Used when a level was defaulted rather than derived from evidence.
    Moderate,
    NonUrgent,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Urgency::Immediate => "immediate",
            Urgency::Urgent => "urgent",
            Urgency::Moderate => "moderate",
            Urgency::NonUrgent => "non-urgent",
        };
        f.write_str(s)
    }
}
