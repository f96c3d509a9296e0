//! Triage report rendering.
//!
//! Turns any `TriageResult`-shaped JSON plus image links into a
//! self-contained HTML document. Nothing here re-runs triage logic:
//! whatever the caller hands in is displayed, and missing fields show as
//! "n/a".

use chrono::{DateTime, Utc};
use orthoassist_core::{Detection, MEDICAL_DISCLAIMER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

const REPORT_TEMPLATE_NAME: &str = "report.html";
const REPORT_TEMPLATE: &str = include_str!("../templates/report.html");

/// MIME type of rendered reports.
pub const CONTENT_TYPE: &str = "text/html; charset=utf-8";

const MISSING: &str = "n/a";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("invalid report input: {0}")]
    InvalidInput(String),
}

/// Links to the uploaded and the annotated radiograph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageUrls {
    #[serde(default)]
    pub original_image_url: Option<String>,
    #[serde(default)]
    pub annotated_image_url: Option<String>,
}

/// Everything a report shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub request_id: String,
    /// Triage result as produced by the engine, or any subset of it.
    #[serde(default)]
    pub triage: Value,
    #[serde(default, alias = "cloudinary_urls")]
    pub image_urls: ImageUrls,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl ReportInput {
    /// Read an analysis payload (`request_id`, `triage`, `image_urls` or
    /// `cloudinary_urls`). Absent keys are tolerated.
    pub fn from_analysis(analysis: &Value) -> Result<Self, ReportError> {
        if !analysis.is_object() {
            return Err(ReportError::InvalidInput("analysis must be a JSON object".into()));
        }
        let request_id = match analysis.get("request_id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "unknown".to_string(),
        };
        let image_urls = analysis
            .get("image_urls")
            .or_else(|| analysis.get("cloudinary_urls"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        Ok(Self {
            request_id,
            triage: analysis.get("triage").cloned().unwrap_or(Value::Null),
            image_urls,
            generated_at: Utc::now(),
        })
    }
}

/// Attachment file name for a report.
pub fn report_filename(request_id: &str) -> String {
    let safe: String = request_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let safe = if safe.is_empty() { "unknown" } else { safe.as_str() };
    format!("orthoassist_report_{}.html", safe)
}

/// Template context. Every field is display-ready.
#[derive(Debug, Serialize)]
struct ReportView<'a> {
    request_id: &'a str,
    generated_at: String,
    level: String,
    level_class: String,
    confidence: Option<f64>,
    method: String,
    body_part: String,
    partial: bool,
    rationale: Vec<String>,
    recommendations: Vec<String>,
    detections: Vec<Detection>,
    original_image_url: Option<&'a str>,
    annotated_image_url: Option<&'a str>,
    disclaimer: String,
}

impl<'a> ReportView<'a> {
    fn from_input(input: &'a ReportInput) -> Result<Self, ReportError> {
        let triage = &input.triage;
        if !(triage.is_object() || triage.is_null()) {
            return Err(ReportError::InvalidInput("triage must be a JSON object".into()));
        }

        let level = text(triage, "level").map(|l| l.to_uppercase());
        let level_class = match level.as_deref() {
            Some("RED") => "red",
            Some("AMBER") => "amber",
            Some("GREEN") => "green",
            _ => "unknown",
        };

        Ok(Self {
            request_id: &input.request_id,
            generated_at: input.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            level: level.unwrap_or_else(|| MISSING.to_string()),
            level_class: level_class.to_string(),
            confidence: triage
                .get("confidence")
                .and_then(Value::as_f64)
                .filter(|c| c.is_finite()),
            method: text(triage, "method").unwrap_or_else(|| MISSING.to_string()),
            body_part: text(triage, "body_part").unwrap_or_else(|| MISSING.to_string()),
            partial: triage.get("partial").and_then(Value::as_bool).unwrap_or(false),
            rationale: string_list(triage.get("rationale")),
            recommendations: string_list(triage.get("recommendations")),
            detections: detections(triage.get("detections")),
            original_image_url: non_empty(&input.image_urls.original_image_url),
            annotated_image_url: non_empty(&input.image_urls.annotated_image_url),
            disclaimer: text(triage, "medical_disclaimer")
                .unwrap_or_else(|| MEDICAL_DISCLAIMER.to_string()),
        })
    }
}

fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A string or a list of strings.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Entries that do not parse as a detection are skipped.
fn detections(value: Option<&Value>) -> Vec<Detection> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|v| serde_json::from_value::<Detection>(v.clone()).ok())
        .filter(|d| d.is_well_formed() && !d.label.trim().is_empty())
        .collect()
}

fn non_empty(url: &Option<String>) -> Option<&str> {
    url.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Renders reports from the bundled HTML template.
#[derive(Debug, Default)]
pub struct ReportRenderer {
    _private: (),
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Configured environment with the report template registered. The
    /// `.html` name turns on HTML auto-escaping.
    fn build_env() -> Result<minijinja::Environment<'static>, ReportError> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_filter("upper", upper_filter);
        env.add_template(REPORT_TEMPLATE_NAME, REPORT_TEMPLATE)?;
        Ok(env)
    }

    /// Render `input` as HTML bytes.
    ///
    /// # Errors
    ///
    /// [`ReportError::InvalidInput`] if `triage` is neither an object nor
    /// null; [`ReportError::Template`] if rendering fails.
    pub fn render(&self, input: &ReportInput) -> Result<Vec<u8>, ReportError> {
        match Self::render_html(input) {
            Ok(html) => {
                debug!(request_id = %input.request_id, bytes = html.len(), "report rendered");
                Ok(html.into_bytes())
            }
            Err(e) => {
                error!(request_id = %input.request_id, error = %e, "report rendering failed");
                Err(e)
            }
        }
    }

    fn render_html(input: &ReportInput) -> Result<String, ReportError> {
        let view = ReportView::from_input(input)?;
        let env = Self::build_env()?;
        Ok(env.get_template(REPORT_TEMPLATE_NAME)?.render(&view)?)
    }

    /// Fixed sample analysis for `request_id`, used until stored analyses
    /// can be looked up by id.
    pub fn sample(request_id: &str) -> ReportInput {
        ReportInput {
            request_id: request_id.to_string(),
            triage: serde_json::json!({
                "level": "AMBER",
                "confidence": 0.72,
                "body_part": "hand",
                "detections": [{"class": "Fracture", "confidence": 0.72}],
            }),
            image_urls: ImageUrls {
                original_image_url: Some("https://example.com/original.jpg".to_string()),
                annotated_image_url: Some("https://example.com/annotated.jpg".to_string()),
            },
            generated_at: Utc::now(),
        }
    }
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}
