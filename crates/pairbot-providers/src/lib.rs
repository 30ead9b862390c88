//! Pairbot providers — completion-service clients.
//!
//! The agent loop depends only on [`CompletionProvider`]; `HttpProvider`
//! implements it for any OpenAI-compatible chat completions endpoint.

pub mod http_provider;
pub mod traits;

pub use http_provider::HttpProvider;
pub use traits::{CompletionProvider, ProviderError, RequestConfig};
