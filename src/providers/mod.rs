pub mod anthropic;
pub mod base;
pub mod errors;

pub use anthropic::AnthropicProvider;
pub use base::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderMetrics};

use reqwest::Client;
use std::time::Duration;

/// Connect timeout for completion HTTP clients (seconds).
pub(crate) const PROVIDER_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Build a `reqwest::Client` with the standard connect timeout. The overall
/// deadline is set per request from `CompletionRequest::timeout`.
pub(crate) fn provider_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(PROVIDER_CONNECT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| Client::new())
}
