use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{chat_messages, json_body, text_at, LlmError, LlmProvider, Message, Role};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }

    /// Messages API takes the system prompt as a top-level field.
    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> serde_json::Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns = chat_messages(messages.iter().filter(|m| m.role != Role::System));

        let mut body = json!({
            "model": self.model,
            "messages": turns,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }
        body
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %self.model, "Claude request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(&messages, temperature, max_tokens))
            .send()
            .await?;

        let body = json_body(response).await?;
        text_at(&body, "/content/0/text")
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_is_lifted_out_of_turns() {
        let p = ClaudeProvider::new("k".into(), "claude-test".into());
        let body = p.request_body(&[Message::system("rules"), Message::user("case")], 0.1, 256);
        assert_eq!(body["system"], "rules");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn no_system_field_without_system_message() {
        let p = ClaudeProvider::new("k".into(), "claude-test".into());
        let body = p.request_body(&[Message::user("case")], 0.1, 256);
        assert!(body.get("system").is_none());
    }
}
