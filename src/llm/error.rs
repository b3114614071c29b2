//! Error types for the LLM client.

use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key was configured for the provider.
    #[error("LLM API key not set (set GROQ_API_KEY or llm.api_key)")]
    MissingApiKey,

    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("LLM API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The provider answered 200 with a body that is not a completion.
    #[error("LLM response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    /// The provider answered 200 but without a usable choice.
    #[error("LLM response contained no choices")]
    EmptyResponse,
}
