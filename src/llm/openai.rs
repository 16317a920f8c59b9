use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CompletionBackend, Message};
use crate::config::Config;
use crate::error::{DocForgeError, Result};

/// Chat completions client for OpenAI and compatible servers
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiBackend {
    /// Builds a client from the `llm` section and the OpenAI key
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.openai_api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_seconds))
            .build()
            .map_err(|e| DocForgeError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.llm.api_base_url.trim_end_matches('/').to_string(),
            temperature: config.llm.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        max_completion_tokens: usize,
    ) -> Result<String> {
        let request = ChatRequest {
            model,
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
            max_tokens: max_completion_tokens,
            temperature: self.temperature,
        };

        let url = self.endpoint();
        debug!("POST {} (model {}, {} prompt chars)", url, model, user_prompt.len());

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocForgeError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocForgeError::Backend(api_error_message(status.as_u16(), &body)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocForgeError::Backend(format!("invalid completion response: {}", e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }
}

/// Prefers the API's own `error.message` over the raw body
fn api_error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    format!("HTTP {}: {}", status, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_prefers_structured_message() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#;
        assert_eq!(api_error_message(429, body), "HTTP 429: Rate limit reached");
        assert_eq!(api_error_message(502, "bad gateway\n"), "HTTP 502: bad gateway");
    }

    #[test]
    fn backend_requires_api_key() {
        let config = Config::default();
        assert!(matches!(OpenAiBackend::new(&config), Err(DocForgeError::Config(_))));
    }

    #[test]
    fn request_omits_unset_temperature() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: vec![Message::system("s"), Message::user("u")],
            max_tokens: 1024,
            temperature: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
        assert_eq!(json["max_tokens"], 1024);
    }
}
