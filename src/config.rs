use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MemchatConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cloud: CloudConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Web sessions idle this long are dropped when a new one starts.
    pub session_idle_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// `"auto"` tries the cloud service first; `"local"` never does.
    pub backend: String,
    pub local_path: String,
    pub default_user: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CloudConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub max_results: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8501,
            log_level: "info".into(),
            session_idle_secs: 12 * 60 * 60,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let local_path = default_memchat_dir()
            .join("memories.json")
            .to_string_lossy()
            .into_owned();
        Self {
            backend: "auto".into(),
            local_path,
            default_user: "default_user".into(),
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.mem0.ai".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai/v1".into(),
            model: "mixtral-8x7b-32768".into(),
            temperature: None,
            timeout_secs: 120,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { max_results: 3 }
    }
}

/// Returns `~/.memchat/`, or `./.memchat/` when there is no home directory.
pub fn default_memchat_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memchat")
}

/// Returns the default config file path: `~/.memchat/config.toml`
pub fn default_config_path() -> PathBuf {
    default_memchat_dir().join("config.toml")
}

impl MemchatConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MemchatConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. The two API keys keep the
    /// provider-conventional names (`MEM0_API_KEY`, `GROQ_API_KEY`).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MEM0_API_KEY") {
            self.cloud.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("GROQ_API_KEY") {
            self.llm.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("MEMCHAT_STORE") {
            self.storage.local_path = val;
        }
        if let Ok(val) = std::env::var("MEMCHAT_USER") {
            self.storage.default_user = val;
        }
        if let Ok(val) = std::env::var("MEMCHAT_BACKEND") {
            self.storage.backend = val;
        }
        if let Ok(val) = std::env::var("MEMCHAT_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("MEMCHAT_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the local store path, expanding `~` if needed.
    pub fn resolved_store_path(&self) -> PathBuf {
        expand_tilde(&self.storage.local_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
