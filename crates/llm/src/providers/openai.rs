use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{chat_messages, json_body, text_at, LlmError, LlmProvider, Message};

/// Any `/v1/chat/completions` endpoint: OpenAI itself, or Groq through
/// its OpenAI-compatible base URL.
pub struct OpenAiProvider {
    client: reqwest::Client,
    name: String,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self::named("openai", api_key, model, base_url)
    }

    pub fn groq(api_key: String, model: String, base_url: String) -> Self {
        Self::named("groq", api_key, model, base_url)
    }

    fn named(name: &str, api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: name.to_string(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// Requests JSON-object output so the reply parses without fences.
    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": chat_messages(messages),
            "temperature": temperature,
            "max_tokens": max_tokens,
            "response_format": { "type": "json_object" },
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = self.endpoint();
        debug!(provider = %self.name, model = %self.model, "chat completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&messages, temperature, max_tokens))
            .send()
            .await?;

        let body = json_body(response).await?;
        text_at(&body, "/choices/0/message/content")
    }

    fn name(&self) -> &str {
        &self.name
    }
}
