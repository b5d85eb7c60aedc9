use crate::errors::RelayError;
use crate::providers::base::ProviderMetrics;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// Gemini's status string for exhausted quota (sent alongside HTTP 429).
const QUOTA_STATUS: &str = "RESOURCE_EXHAUSTED";

/// Common error handling utilities for LLM providers
///
/// Maps HTTP failures and API-level error bodies onto [`RelayError`] so
/// callers can tell quota exhaustion apart from every other failure.
pub struct ProviderErrorHandler;

impl ProviderErrorHandler {
    /// Parse an API error body into a typed error.
    ///
    /// Understands both `{"error": {"status", "message"}}` (Google) and
    /// `{"error": {"type", "message"}}` shapes.
    pub fn parse_api_error(status: u16, error_text: &str) -> RelayError {
        let retryable = matches!(status, 500 | 502 | 503 | 504);

        if let Ok(error_json) = serde_json::from_str::<Value>(error_text)
            && let Some(err) = error_json.get("error")
        {
            let error_type = err
                .get("status")
                .or_else(|| err.get("type"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let error_msg = err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");

            if error_type == QUOTA_STATUS {
                warn!("quota exhausted: {}", error_msg);
                return RelayError::RateLimit { retry_after: None };
            }

            if error_type == "NOT_FOUND" && error_msg.contains("models/") {
                return RelayError::Provider {
                    message: format!(
                        "Model not found: {}. Check gemini.model in your config file.",
                        error_msg
                    ),
                    retryable: false,
                };
            }

            return RelayError::Provider {
                message: format!("API error ({}): {}", error_type, error_msg),
                retryable,
            };
        }

        RelayError::Provider {
            message: format!("API error ({}): {}", status, error_text),
            retryable,
        }
    }

    /// Log and handle provider errors consistently
    pub fn log_and_handle_error(e: &anyhow::Error, provider_name: &str, operation: &str) {
        error!(
            "{} provider error during {}: {}",
            provider_name, operation, e
        );
    }

    /// Handle rate limiting errors
    pub fn handle_rate_limit(status: u16, retry_after: Option<u64>) -> RelayError {
        if let Some(seconds) = retry_after {
            warn!("Rate limit hit. Retry after {} seconds", seconds);
        } else {
            warn!("Rate limit hit (status: {})", status);
        }
        RelayError::RateLimit { retry_after }
    }

    /// Handle authentication errors
    pub fn handle_auth_error(status: u16, error_text: &str) -> RelayError {
        warn!("Authentication error (status: {}): {}", status, error_text);
        RelayError::Auth(format!(
            "Authentication failed. Please check your API key or credentials. Error: {}",
            error_text
        ))
    }

    /// Check HTTP status and return a typed error if the response is not successful.
    /// On error, consumes the response body to extract error details.
    /// On success, returns the response unchanged for further processing.
    pub async fn check_http_status(
        resp: reqwest::Response,
        provider: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let error_text = crate::utils::http::limited_text(
            resp,
            crate::utils::http::MAX_ERROR_BODY_BYTES,
        )
        .await
        .unwrap_or_else(|_| "unknown error".to_string());

        if status == 429 {
            Self::log_and_handle_error(&anyhow::anyhow!("Rate limit exceeded"), provider, "chat");
            return Err(Self::handle_rate_limit(status.as_u16(), retry_after).into());
        }

        if status == 401 || status == 403 {
            Self::log_and_handle_error(&anyhow::anyhow!("Authentication failed"), provider, "chat");
            return Err(Self::handle_auth_error(status.as_u16(), &error_text).into());
        }

        Self::log_and_handle_error(&anyhow::anyhow!("API error"), provider, "chat");
        Err(Self::parse_api_error(status.as_u16(), &error_text).into())
    }

    /// Check an HTTP response for errors (rate limit, auth, generic API errors).
    /// Returns the response body as JSON on success, or a typed error on failure.
    pub async fn check_response(
        resp: reqwest::Response,
        provider: &str,
        metrics: &Arc<Mutex<ProviderMetrics>>,
    ) -> Result<Value, anyhow::Error> {
        let resp = match Self::check_http_status(resp, provider).await {
            Ok(resp) => resp,
            Err(e) => {
                if let Ok(mut m) = metrics.lock() {
                    m.error_count += 1;
                }
                return Err(e);
            }
        };

        let json: Value = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse {} API response: {}", provider, e))?;

        // API-level errors can arrive with a 200 status
        if let Some(error_val) = json.get("error") {
            if let Ok(mut m) = metrics.lock() {
                m.error_count += 1;
            }
            let error_text =
                serde_json::to_string(&serde_json::json!({ "error": error_val }))
                    .unwrap_or_else(|_| "Unknown error".to_string());
            Self::log_and_handle_error(&anyhow::anyhow!("API error in response"), provider, "chat");
            return Err(Self::parse_api_error(200, &error_text).into());
        }

        Ok(json)
    }
}
