use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{chat_messages, json_body, text_at, LlmError, LlmProvider, Message};

/// Local models served by Ollama's `/api/chat`.
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": chat_messages(messages),
            "stream": false,
            "format": "json",
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.url);
        debug!(model = %self.model, "Ollama request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(&messages, temperature, max_tokens))
            .send()
            .await?;

        let body = json_body(response).await?;
        text_at(&body, "/message/content")
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_streaming_json_request() {
        let p = OllamaProvider::new("http://localhost:11434/".into(), "llama3.1".into());
        let body = p.request_body(&[Message::user("x")], 0.2, 64);
        assert_eq!(body["stream"], false);
        assert_eq!(body["format"], "json");
        assert_eq!(body["options"]["num_predict"], 64);
        assert_eq!(p.url, "http://localhost:11434");
    }
}
