//! Chat with a hosted large language model that remembers each user across
//! sessions.
//!
//! Every turn recalls a few relevant memories for the user, passes them to
//! the model in a system prompt together with the session history, and
//! stores the exchange afterwards. Memories live in the hosted Mem0 service
//! when it can be reached at startup, and in a local JSON file otherwise.
//!
//! # Modules
//!
//! - [`config`]: configuration from `~/.memchat/config.toml` and environment variables
//! - [`memory`]: the memory facade and its cloud and local backends
//! - [`llm`]: OpenAI-compatible chat-completions client (Groq by default)
//! - [`chat`]: the per-turn orchestration
//! - [`health`]: connection test for both upstream services
//! - [`server`]: the web UI and its JSON endpoints

pub mod chat;
pub mod config;
pub mod health;
pub mod llm;
pub mod memory;
pub mod server;
