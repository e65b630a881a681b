use crate::errors::ShellpilotError;
use crate::session::Turn;
use async_trait::async_trait;
use std::time::Duration;

/// One request to the completion service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: Option<String>,
    pub messages: Vec<Turn>,
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Turn>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 2000,
            system: None,
            messages,
            timeout: Duration::from_secs(120),
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_tokens: None,
            output_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderMetrics {
    pub request_count: u64,
    pub token_count: u64,
    pub error_count: u64,
}

/// The completion service: request in, text out.
///
/// Implementations never retry; timeouts and non-success statuses surface as
/// `ShellpilotError::Completion`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, req: CompletionRequest)
    -> Result<CompletionResponse, ShellpilotError>;

    fn default_model(&self) -> &str;

    fn metrics(&self) -> ProviderMetrics {
        ProviderMetrics::default()
    }
}
