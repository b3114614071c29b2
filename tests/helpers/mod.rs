#![allow(dead_code)]

use memchat::config::{CloudConfig, LlmConfig, MemchatConfig};
use memchat::memory::local::LocalStore;
use memchat::memory::MemoryStore;
use serde_json::{json, Value};
use std::path::Path;

pub const LLM_KEY: &str = "gsk-test";
pub const MEM0_KEY: &str = "m0-test";

/// Config whose local store lives in `dir` and whose upstreams point at the
/// given base URLs (use `None` for the cloud key to force fallback).
pub fn test_config(dir: &Path, cloud_url: &str, cloud_key: Option<&str>, llm_url: &str) -> MemchatConfig {
    let mut config = MemchatConfig::default();
    config.storage.local_path = dir.join("memories.json").to_string_lossy().into_owned();
    config.cloud = cloud_config(cloud_url, cloud_key);
    config.llm = llm_config(llm_url);
    config
}

pub fn cloud_config(base_url: &str, api_key: Option<&str>) -> CloudConfig {
    CloudConfig {
        api_key: api_key.map(str::to_string),
        base_url: base_url.to_string(),
        timeout_secs: 5,
    }
}

pub fn llm_config(base_url: &str) -> LlmConfig {
    LlmConfig {
        api_key: Some(LLM_KEY.to_string()),
        base_url: base_url.to_string(),
        model: "mixtral-8x7b-32768".to_string(),
        temperature: None,
        timeout_secs: 5,
    }
}

/// Memory facade backed by a fresh local file in `dir`.
pub fn local_memory(dir: &Path) -> MemoryStore {
    MemoryStore::local(LocalStore::new(dir.join("memories.json")), 3)
}

/// A minimal OpenAI-style completion response.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "mixtral-8x7b-32768",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}
