//! Hosted language-model access.
//!
//! [`ChatClient`] speaks the OpenAI chat-completions dialect, which Groq (the
//! default provider) and most hosted or local gateways accept. Requests are
//! sent once; there is no retry layer.

pub mod client;
pub mod error;
pub mod types;

pub use client::ChatClient;
pub use error::{LlmError, Result};
pub use types::{ChatMessage, Role};
