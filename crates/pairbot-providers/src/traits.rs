//! Completion-service abstraction.
//!
//! The agent loop only ever sees this trait; the HTTP implementation in
//! `http_provider.rs` covers any OpenAI-compatible `/chat/completions` API.

use async_trait::async_trait;
use pairbot_core::types::Message;

/// Errors from the completion service.
///
/// Every variant is fatal to a run: the loop retries malformed *content*,
/// never transport failure.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network-level failure (connect, TLS, timeout).
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status from the API.
    #[error("completion API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// 2xx response whose body did not contain usable text.
    #[error("completion response had no content: {0}")]
    EmptyResponse(String),
}

/// Generation settings passed to each completion call.
#[derive(Clone, Debug)]
pub struct RequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Trait implemented by every completion backend.
///
/// Synchronous from the loop controller's point of view: one outstanding
/// call at a time, the controller awaits the reply before anything else.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send the running conversation, get the model's raw text back.
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError>;

    /// The model this provider instance talks to.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
