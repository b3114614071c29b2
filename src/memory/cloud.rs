//! Client for the hosted Mem0 memory API.
//!
//! All calls are scoped by `user_id` and authenticated with
//! `Authorization: Token <key>`. [`CloudMemoryClient::connect`] validates the
//! key with a ping before handing out a client.

use anyhow::{bail, Context, Result};
use reqwest::{header, Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::CloudConfig;
use crate::llm::ChatMessage;

#[derive(Serialize)]
struct AddRequest<'a> {
    messages: &'a [ChatMessage],
    user_id: &'a str,
    version: &'static str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    user_id: &'a str,
    limit: usize,
}

/// A memory record as returned by the service. Only the text is kept; ids,
/// scores and metadata are ignored.
#[derive(Debug, Deserialize)]
pub struct CloudMemory {
    pub memory: String,
}

/// The service returns either a bare list or a `{"results": [...]}` envelope
/// depending on API version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MemoryListResponse {
    Envelope {
        #[serde(default)]
        results: Vec<CloudMemory>,
    },
    Bare(Vec<CloudMemory>),
}

impl MemoryListResponse {
    fn into_texts(self) -> Vec<String> {
        let items = match self {
            Self::Envelope { results } => results,
            Self::Bare(items) => items,
        };
        items.into_iter().map(|m| m.memory).collect()
    }
}

#[derive(Debug, Clone)]
pub struct CloudMemoryClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl CloudMemoryClient {
    /// Build a client and verify the credential against the service.
    ///
    /// Fails when the key is missing or blank, or the ping does not succeed.
    pub async fn connect(config: &CloudConfig) -> Result<Self> {
        let api_key = match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => bail!("cloud memory API key not set (MEM0_API_KEY)"),
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let client = Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        };
        client.ping().await.context("cloud memory ping failed")?;
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn user_url(&self, path: &str, user_id: &str) -> Result<Url> {
        Url::parse_with_params(&self.url(path), &[("user_id", user_id)])
            .context("invalid cloud memory URL")
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header(header::AUTHORIZATION, format!("Token {}", self.api_key))
    }

    /// Check that the key is accepted.
    pub async fn ping(&self) -> Result<()> {
        let response = self
            .auth(self.http.get(self.url("/v1/ping/")))
            .send()
            .await
            .context("cloud memory request failed")?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn add(&self, user_id: &str, text: &str) -> Result<()> {
        self.add_messages(user_id, &[ChatMessage::user(text)]).await
    }

    /// Store a role-tagged exchange; the service extracts memories from it.
    pub async fn add_messages(&self, user_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let body = AddRequest {
            messages,
            user_id,
            version: "v2",
        };
        let response = self
            .auth(self.http.post(self.url("/v1/memories/")))
            .json(&body)
            .send()
            .await
            .context("cloud memory request failed")?;
        ensure_success(response).await?;
        tracing::debug!(user_id, messages = messages.len(), "cloud memory added");
        Ok(())
    }

    pub async fn search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<String>> {
        let body = SearchRequest {
            query,
            user_id,
            limit,
        };
        let response = self
            .auth(self.http.post(self.url("/v1/memories/search/")))
            .json(&body)
            .send()
            .await
            .context("cloud memory request failed")?;
        let parsed: MemoryListResponse = ensure_success(response)
            .await?
            .json()
            .await
            .context("unexpected cloud memory search response")?;
        Ok(parsed.into_texts())
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<String>> {
        let url = self.user_url("/v1/memories/", user_id)?;
        let response = self
            .auth(self.http.get(url))
            .send()
            .await
            .context("cloud memory request failed")?;
        let parsed: MemoryListResponse = ensure_success(response)
            .await?
            .json()
            .await
            .context("unexpected cloud memory list response")?;
        Ok(parsed.into_texts())
    }

    pub async fn clear(&self, user_id: &str) -> Result<()> {
        let url = self.user_url("/v1/memories/", user_id)?;
        let response = self
            .auth(self.http.delete(url))
            .send()
            .await
            .context("cloud memory request failed")?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("cloud memory API error {status}: {body}")
}
