use super::*;

#[test]
fn test_parse_json_error_body() {
    let body = r#"{"error": {"type": "overloaded_error", "message": "Overloaded"}}"#;
    match ProviderErrorHandler::parse_api_error(529, body) {
        ShellpilotError::Completion {
            message,
            status,
            retryable,
        } => {
            assert_eq!(message, "API error 529 (overloaded_error): Overloaded");
            assert_eq!(status, Some(529));
            assert!(!retryable);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_parse_plain_body() {
    let err = ProviderErrorHandler::parse_api_error(502, "Bad Gateway");
    assert!(err.is_retryable());
    assert_eq!(err.to_string(), "Completion error: API error 502: Bad Gateway");
}

#[test]
fn test_parse_empty_body() {
    let err = ProviderErrorHandler::parse_api_error(404, "");
    assert_eq!(err.to_string(), "Completion error: API error 404");
}

#[test]
fn test_rate_limit_is_retryable() {
    assert!(ProviderErrorHandler::parse_api_error(429, "slow down").is_retryable());
}

#[test]
fn test_every_server_error_is_retryable() {
    for status in [500, 501, 502, 503, 504, 529, 599] {
        assert!(
            ProviderErrorHandler::parse_api_error(status, "").is_retryable(),
            "{}",
            status
        );
    }
    assert!(!ProviderErrorHandler::parse_api_error(400, "").is_retryable());
}

#[test]
fn test_auth_error_not_retryable() {
    let body = r#"{"error": {"type": "authentication_error", "message": "invalid x-api-key"}}"#;
    assert!(!ProviderErrorHandler::parse_api_error(401, body).is_retryable());
}
