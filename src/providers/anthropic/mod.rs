use crate::config::ProviderConfig;
use crate::errors::ShellpilotError;
use crate::providers::base::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderMetrics,
};
use crate::providers::errors::ProviderErrorHandler;
use crate::providers::provider_http_client;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const MESSAGES_PATH: &str = "/v1/messages";
const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client (also works against compatible local proxies).
pub struct AnthropicProvider {
    api_key: String,
    default_model: String,
    endpoint: String,
    anthropic_version: String,
    client: Client,
    metrics: Arc<Mutex<ProviderMetrics>>,
}

impl AnthropicProvider {
    pub fn new(api_key: String, api_base: &str, default_model: String) -> Self {
        Self {
            api_key,
            default_model,
            endpoint: format!("{}{}", api_base.trim_end_matches('/'), MESSAGES_PATH),
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            client: provider_http_client(),
            metrics: Arc::new(Mutex::new(ProviderMetrics::default())),
        }
    }

    pub fn from_config(config: &ProviderConfig, model: &str) -> Self {
        if config.api_key.is_empty() {
            warn!("no API key configured (set provider.apiKey or SHELLPILOT_API_KEY)");
        }
        let mut provider = Self::new(config.api_key.clone(), &config.api_base, model.to_string());
        provider.anthropic_version.clone_from(&config.anthropic_version);
        provider
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn record_error(&self) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.error_count += 1;
        }
    }
}

/// Concatenate the `text` blocks of a Messages API response.
fn parse_response(json: &Value) -> Result<CompletionResponse, ShellpilotError> {
    let text = json
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ShellpilotError::completion("response contained no text"));
    }

    let usage = json.get("usage");
    Ok(CompletionResponse {
        text,
        input_tokens: usage
            .and_then(|u| u.get("input_tokens"))
            .and_then(Value::as_u64),
        output_tokens: usage
            .and_then(|u| u.get("output_tokens"))
            .and_then(Value::as_u64),
    })
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn complete(
        &self,
        req: CompletionRequest,
    ) -> Result<CompletionResponse, ShellpilotError> {
        debug!(
            "completion: model={} messages={} max_tokens={}",
            req.model,
            req.messages.len(),
            req.max_tokens
        );

        let messages: Vec<Value> = req
            .messages
            .iter()
            .map(|t| json!({"role": t.role.as_str(), "content": t.content}))
            .collect();
        let mut payload = json!({
            "model": req.model,
            "max_tokens": req.max_tokens,
            "messages": messages,
        });
        if let Some(system) = &req.system {
            payload["system"] = Value::String(system.clone());
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.anthropic_version)
            .json(&payload)
            .timeout(req.timeout)
            .send()
            .await
            .map_err(|e| {
                self.record_error();
                ProviderErrorHandler::from_request_error(&e, "anthropic")
            })?;

        let resp = match ProviderErrorHandler::check_http_status(resp, "anthropic").await {
            Ok(resp) => resp,
            Err(e) => {
                self.record_error();
                return Err(e);
            }
        };

        let json: Value = resp.json().await.map_err(|e| {
            self.record_error();
            ShellpilotError::completion(format!("invalid response body: {}", e))
        })?;
        let response = parse_response(&json)?;

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.request_count += 1;
            metrics.token_count +=
                response.input_tokens.unwrap_or(0) + response.output_tokens.unwrap_or(0);
        }
        debug!(
            "completion done: input_tokens={:?}, output_tokens={:?}",
            response.input_tokens, response.output_tokens
        );
        Ok(response)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn metrics(&self) -> ProviderMetrics {
        self.metrics
            .lock()
            .map_or_else(|_| ProviderMetrics::default(), |m| m.clone())
    }
}
