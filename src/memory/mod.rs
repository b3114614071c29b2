//! Per-user conversation memory with a cloud-first, local-fallback backend.
//!
//! [`MemoryStore::connect`] picks the backend exactly once: the hosted
//! service if its client can be built and pinged, otherwise the local JSON
//! file. Every later call goes to that backend; errors are returned to the
//! caller and never cause a switch.

pub mod cloud;
pub mod lexical;
pub mod local;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::MemchatConfig;
use crate::llm::ChatMessage;
use cloud::CloudMemoryClient;
use local::LocalStore;

/// Which backend was selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Cloud,
    Local,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
enum Backend {
    Cloud(CloudMemoryClient),
    Local(LocalStore),
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    backend: Backend,
    search_limit: usize,
}

impl MemoryStore {
    /// Select the backend for the lifetime of the process.
    pub async fn connect(config: &MemchatConfig) -> Self {
        let local = LocalStore::new(config.resolved_store_path());
        let limit = config.retrieval.max_results;

        if config.storage.backend.eq_ignore_ascii_case("local") {
            tracing::info!(path = %local.path().display(), "using local memory store (configured)");
            return Self::local(local, limit);
        }

        match CloudMemoryClient::connect(&config.cloud).await {
            Ok(client) => {
                tracing::info!(base_url = %client.base_url(), "using cloud memory service");
                Self::cloud(client, limit)
            }
            Err(e) => {
                tracing::warn!(
                    error = %format!("{e:#}"),
                    path = %local.path().display(),
                    "cloud memory unavailable, falling back to local store"
                );
                Self::local(local, limit)
            }
        }
    }

    pub fn local(store: LocalStore, search_limit: usize) -> Self {
        Self {
            backend: Backend::Local(store),
            search_limit,
        }
    }

    pub fn cloud(client: CloudMemoryClient, search_limit: usize) -> Self {
        Self {
            backend: Backend::Cloud(client),
            search_limit,
        }
    }

    pub fn backend(&self) -> BackendKind {
        match self.backend {
            Backend::Cloud(_) => BackendKind::Cloud,
            Backend::Local(_) => BackendKind::Local,
        }
    }

    /// Human-readable location of the active backend (URL or file path).
    pub fn location(&self) -> String {
        match &self.backend {
            Backend::Cloud(client) => client.base_url().to_string(),
            Backend::Local(store) => store.path().display().to_string(),
        }
    }

    pub async fn add(&self, user_id: &str, text: &str) -> Result<()> {
        match &self.backend {
            Backend::Cloud(client) => client.add(user_id, text).await,
            Backend::Local(store) => {
                let (store, user_id, text) = (store.clone(), user_id.to_string(), text.to_string());
                run_blocking(move || store.add(&user_id, &text)).await
            }
        }
    }

    /// Store a conversation exchange. The local store keeps one
    /// `"<role>: <content>"` entry per message.
    pub async fn add_exchange(&self, user_id: &str, messages: &[ChatMessage]) -> Result<()> {
        match &self.backend {
            Backend::Cloud(client) => client.add_messages(user_id, messages).await,
            Backend::Local(store) => {
                let store = store.clone();
                let user_id = user_id.to_string();
                let entries: Vec<String> = messages
                    .iter()
                    .map(|m| format!("{}: {}", m.role, m.content))
                    .collect();
                run_blocking(move || store.add_all(&user_id, entries)).await
            }
        }
    }

    /// Memories relevant to `query`, most relevant first.
    pub async fn search(&self, user_id: &str, query: &str) -> Result<Vec<String>> {
        let limit = self.search_limit;
        match &self.backend {
            Backend::Cloud(client) => client.search(user_id, query, limit).await,
            Backend::Local(store) => {
                let (store, user_id, query) = (store.clone(), user_id.to_string(), query.to_string());
                run_blocking(move || store.search(&user_id, &query, limit)).await
            }
        }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<String>> {
        match &self.backend {
            Backend::Cloud(client) => client.list(user_id).await,
            Backend::Local(store) => {
                let (store, user_id) = (store.clone(), user_id.to_string());
                run_blocking(move || store.list(&user_id)).await
            }
        }
    }

    pub async fn clear(&self, user_id: &str) -> Result<()> {
        match &self.backend {
            Backend::Cloud(client) => client.clear(user_id).await,
            Backend::Local(store) => {
                let (store, user_id) = (store.clone(), user_id.to_string());
                let removed = run_blocking(move || store.clear(&user_id)).await?;
                tracing::debug!(removed, "local memory cleared");
                Ok(())
            }
        }
    }

    /// Connection test for the selected backend.
    pub async fn check(&self) -> Result<()> {
        match &self.backend {
            Backend::Cloud(client) => client.ping().await,
            Backend::Local(store) => {
                let store = store.clone();
                run_blocking(move || store.load().map(|_| ())).await
            }
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("memory task failed")?
}
