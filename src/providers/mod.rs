pub mod base;
pub mod circuit_breaker;
pub mod errors;
pub mod gemini;

use reqwest::Client;
use std::time::Duration;

/// Connect timeout for LLM provider HTTP clients (seconds).
pub(crate) const PROVIDER_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Overall request timeout for LLM provider HTTP clients (seconds).
///
/// The breaker applies its own, shorter deadline per call; this only stops
/// a stuck connection from living forever.
pub(crate) const PROVIDER_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Build a `reqwest::Client` with standard provider timeouts.
pub(crate) fn provider_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(PROVIDER_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(PROVIDER_REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| Client::new())
}
