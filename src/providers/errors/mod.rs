use crate::errors::ShellpilotError;
use serde_json::Value;
use tracing::{error, warn};

/// Common error handling for completion HTTP responses.
pub struct ProviderErrorHandler;

impl ProviderErrorHandler {
    /// Build a typed error from a non-success status and its body.
    pub fn parse_api_error(status: u16, error_text: &str) -> ShellpilotError {
        let retryable = status == 429 || (500..600).contains(&status);

        if let Ok(error_json) = serde_json::from_str::<Value>(error_text)
            && let Some(err) = error_json.get("error")
        {
            let error_type = err
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let error_msg = err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            return ShellpilotError::Completion {
                message: format!("API error {} ({}): {}", status, error_type, error_msg),
                status: Some(status),
                retryable,
            };
        }

        let body = error_text.trim();
        let message = if body.is_empty() {
            format!("API error {}", status)
        } else {
            format!("API error {}: {}", status, body)
        };
        ShellpilotError::Completion {
            message,
            status: Some(status),
            retryable,
        }
    }

    /// Map a transport-level reqwest failure.
    pub fn from_request_error(e: &reqwest::Error, provider: &str) -> ShellpilotError {
        if e.is_timeout() {
            warn!("{} request timed out", provider);
            return ShellpilotError::Completion {
                message: "request timed out".to_string(),
                status: None,
                retryable: true,
            };
        }
        error!("{} request failed: {}", provider, e);
        ShellpilotError::Completion {
            message: format!("request failed: {}", e),
            status: None,
            retryable: e.is_connect(),
        }
    }

    /// Return the response on success, or consume the body into a typed error.
    pub async fn check_http_status(
        resp: reqwest::Response,
        provider: &str,
    ) -> Result<reqwest::Response, ShellpilotError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status().as_u16();
        let error_text = resp
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());

        match status {
            429 => warn!("{} rate limit hit", provider),
            401 | 403 => warn!("{} authentication failed: {}", provider, error_text),
            _ => error!("{} API error (status {})", provider, status),
        }
        Err(Self::parse_api_error(status, &error_text))
    }
}

#[cfg(test)]
mod tests;
