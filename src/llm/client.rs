use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{LlmError, Result};
use super::types::ChatMessage;
use crate::config::LlmConfig;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client.
///
/// Construction never touches the network and succeeds without an API key so
/// that the UI can still start and report the problem through the connection
/// test; calls made without a key fail with [`LlmError::MissingApiKey`].
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

impl ChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(LlmError::MissingApiKey)
    }

    /// Send the conversation and return the first choice's text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "sending chat completion");

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let raw = response.text().await?;
        let parsed: CompletionResponse = serde_json::from_str(&raw)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        tracing::debug!(reply_len = content.len(), "chat completion received");
        Ok(content)
    }

    /// Connection test: list models with the configured key.
    pub async fn check(&self) -> Result<()> {
        let api_key = self.api_key()?;
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }
        Ok(())
    }
}
