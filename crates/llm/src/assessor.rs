//! LLM-backed second opinion for low-confidence rule outcomes.

use async_trait::async_trait;
use orthoassist_core::config::{LlmConfig, OllamaConfig};
use orthoassist_core::{Detection, ExternalAssessment, TriageError, TriageLevel};
use orthoassist_triage::ExternalAssessor;
use serde::Deserialize;
use tracing::{debug, info};

use crate::provider::{LlmError, LlmProvider, Message};
use crate::providers::create_provider;

const SYSTEM_PROMPT: &str = "You are an orthopedic triage assistant. Given fracture-detection \
model findings from a radiograph and optional patient-reported symptoms, classify urgency as \
RED (immediate emergency care), AMBER (medical attention within 24-48 hours) or GREEN \
(routine follow-up). Be conservative: when unsure between two levels, choose the more urgent \
one. Respond ONLY with a JSON object of the form \
{\"level\": \"RED|AMBER|GREEN\", \"confidence\": <number between 0 and 1>, \
\"rationale\": [\"short reason\", ...]}.";

/// Asks a chat model for `{level, confidence, rationale}`.
pub struct LlmAssessor {
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmAssessor {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Build from config, creating the appropriate provider.
    pub fn from_config(llm_config: &LlmConfig, ollama_config: &OllamaConfig) -> Result<Self, LlmError> {
        let provider = create_provider(llm_config, ollama_config)?;
        info!(provider = provider.name(), "LLM assessor ready");
        Ok(Self::new(provider, llm_config.temperature, llm_config.max_tokens))
    }
}

#[async_trait]
impl ExternalAssessor for LlmAssessor {
    async fn generate_assessment(
        &self,
        detections: &[Detection],
        symptoms: Option<&str>,
        body_part: Option<&str>,
    ) -> Result<ExternalAssessment, TriageError> {
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(user_prompt(detections, symptoms, body_part)),
        ];

        let response = self
            .provider
            .complete(messages, self.temperature, self.max_tokens)
            .await
            .map_err(|e| TriageError::ExternalAssessment(e.to_string()))?;

        debug!(provider = self.provider.name(), "LLM response: {}", response);
        parse_assessment(&response).map_err(|e| TriageError::ExternalAssessment(e.to_string()))
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

fn user_prompt(detections: &[Detection], symptoms: Option<&str>, body_part: Option<&str>) -> String {
    let mut prompt = format!("Body part: {}\n", body_part.unwrap_or("unspecified"));
    if detections.is_empty() {
        prompt.push_str("Detections: none\n");
    } else {
        prompt.push_str("Detections:\n");
        for d in detections {
            prompt.push_str(&format!("- {} (confidence {:.2})\n", d.label, d.confidence));
        }
    }
    match symptoms.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => prompt.push_str(&format!("Patient-reported symptoms: {}\n", s)),
        None => prompt.push_str("Patient-reported symptoms: none reported\n"),
    }
    prompt.push_str("\nRespond ONLY with valid JSON, no explanation.");
    prompt
}

/// Reply shape; models vary in how faithfully they follow it.
#[derive(Debug, Deserialize)]
struct RawAssessment {
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    rationale: Option<RawRationale>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRationale {
    One(String),
    Many(Vec<String>),
}

/// Lenient parse: missing level reads as AMBER, missing confidence as 0,
/// rationale may be a string or a list.
fn parse_assessment(response: &str) -> Result<ExternalAssessment, LlmError> {
    let raw: RawAssessment = serde_json::from_str(extract_json(response))
        .map_err(|e| LlmError::ParseError(format!("invalid assessment JSON: {}", e)))?;

    let level = match raw.level.as_deref() {
        None => TriageLevel::Amber,
        Some(s) => s
            .parse::<TriageLevel>()
            .map_err(|_| LlmError::ParseError(format!("unknown triage level '{}'", s)))?,
    };

    let confidence = raw.confidence.unwrap_or(0.0);
    if !confidence.is_finite() {
        return Err(LlmError::ParseError("confidence is not a number".into()));
    }

    let rationale = match raw.rationale {
        None => Vec::new(),
        Some(RawRationale::One(s)) if s.trim().is_empty() => Vec::new(),
        Some(RawRationale::One(s)) => vec![s],
        Some(RawRationale::Many(v)) => v.into_iter().filter(|s| !s.trim().is_empty()).collect(),
    };

    Ok(ExternalAssessment {
        level,
        confidence: confidence.clamp(0.0, 1.0),
        rationale,
    })
}

/// Extract JSON from an LLM response, handling markdown code blocks.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_tick = &trimmed[start + 3..];
        // Skip past any language identifier on the fence line
        let content_start = after_tick.find('\n').map_or(0, |n| n + 1);
        if let Some(end) = after_tick[content_start..].find("```") {
            return after_tick[content_start..content_start + end].trim();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;
    use std::sync::{Arc, Mutex};

    /// Replays a canned reply and records the prompts it was sent.
    struct Scripted {
        reply: Result<String, u16>,
        seen: Arc<Mutex<Vec<Message>>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Arc::default(),
            }
        }

        fn status(code: u16) -> Self {
            Self {
                reply: Err(code),
                seen: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            self.seen.lock().unwrap().extend(messages);
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(status) => Err(LlmError::ApiError {
                    status: *status,
                    body: "unavailable".into(),
                }),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    // ── extract_json ────────────────────────────────────────────────

    #[test]
    fn extract_json_raw() {
        let input = r#"{"level": "RED"}"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn extract_json_code_block() {
        let input = "Assessment:\n```json\n{\"level\": \"RED\"}\n```\nStay safe.";
        assert_eq!(extract_json(input), r#"{"level": "RED"}"#);
    }

    #[test]
    fn extract_json_bare_fence() {
        let input = "```\n{\"level\": \"GREEN\"}\n```";
        assert_eq!(extract_json(input), r#"{"level": "GREEN"}"#);
    }

    #[test]
    fn extract_json_with_prose() {
        let input = "Sure, here it is: {\"level\": \"AMBER\"} Hope that helps.";
        assert_eq!(extract_json(input), r#"{"level": "AMBER"}"#);
    }

    // ── parse_assessment ────────────────────────────────────────────

    #[test]
    fn parses_list_rationale() {
        let a = parse_assessment(
            r#"{"level": "red", "confidence": 0.82, "rationale": ["Displacement", ""]}"#,
        )
        .unwrap();
        assert_eq!(a.level, TriageLevel::Red);
        assert_eq!(a.confidence, 0.82);
        assert_eq!(a.rationale, vec!["Displacement"]);
    }

    #[test]
    fn parses_string_rationale() {
        let a = parse_assessment(r#"{"level": "Green", "confidence": 0.4, "rationale": "Soft tissue only"}"#)
            .unwrap();
        assert_eq!(a.level, TriageLevel::Green);
        assert_eq!(a.rationale, vec!["Soft tissue only"]);
    }

    #[test]
    fn missing_fields_default_conservatively() {
        let a = parse_assessment("{}").unwrap();
        assert_eq!(a.level, TriageLevel::Amber);
        assert_eq!(a.confidence, 0.0);
        assert!(a.rationale.is_empty());
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(parse_assessment(r#"{"level": "AMBER", "confidence": 1.7}"#).unwrap().confidence, 1.0);
        assert_eq!(parse_assessment(r#"{"level": "AMBER", "confidence": -3}"#).unwrap().confidence, 0.0);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let err = parse_assessment(r#"{"level": "PURPLE"}"#).unwrap_err();
        assert!(err.to_string().contains("PURPLE"));
        assert!(parse_assessment("I cannot help with that").is_err());
    }

    // ── LlmAssessor ─────────────────────────────────────────────────

    #[test]
    fn prompt_lists_findings() {
        let prompt = user_prompt(
            &[Detection::new("Fracture", 0.734)],
            Some("  swelling  "),
            Some("hand"),
        );
        assert!(prompt.contains("Body part: hand"));
        assert!(prompt.contains("- Fracture (confidence 0.73)"));
        assert!(prompt.contains("Patient-reported symptoms: swelling\n"));

        let empty = user_prompt(&[], None, None);
        assert!(empty.contains("Detections: none"));
        assert!(empty.contains("Body part: unspecified"));
    }

    #[tokio::test]
    async fn assessor_round_trip() {
        let provider = Scripted::ok("```json\n{\"level\": \"AMBER\", \"confidence\": 0.66, \"rationale\": \"Cortical break\"}\n```");
        let assessor = LlmAssessor::new(Box::new(provider), 0.1, 256);
        let a = assessor
            .generate_assessment(&[Detection::new("fracture", 0.5)], None, Some("leg"))
            .await
            .unwrap();
        assert_eq!(a.level, TriageLevel::Amber);
        assert_eq!(a.confidence, 0.66);
        assert_eq!(assessor.name(), "scripted");
    }

    #[tokio::test]
    async fn assessor_sends_system_then_user() {
        let provider = Scripted::ok(r#"{"level": "GREEN", "confidence": 0.5}"#);
        let seen = Arc::clone(&provider.seen);
        let assessor = LlmAssessor::new(Box::new(provider), 0.1, 256);
        assessor
            .generate_assessment(&[], Some("mild ache"), None)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Message::system(SYSTEM_PROMPT));
        assert_eq!(seen[1].role, Role::User);
        assert!(seen[1].content.contains("mild ache"));
        assert!(seen[1].content.ends_with("Respond ONLY with valid JSON, no explanation."));
    }

    #[tokio::test]
    async fn provider_failure_is_external_error() {
        let assessor = LlmAssessor::new(Box::new(Scripted::status(503)), 0.1, 256);
        let err = assessor.generate_assessment(&[], None, None).await.unwrap_err();
        assert!(matches!(err, TriageError::ExternalAssessment(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn garbage_reply_is_external_error() {
        let assessor = LlmAssessor::new(Box::new(Scripted::ok("no json here")), 0.1, 256);
        let err = assessor.generate_assessment(&[], None, None).await.unwrap_err();
        assert!(err.is_external());
    }
}
