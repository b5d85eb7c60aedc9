use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LLMResponse {
    pub content: Option<String>,
    /// Total token count reported by the provider (if available).
    pub total_tokens: Option<u64>,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            total_tokens: None,
        }
    }

    /// Trimmed reply text, or `None` when the provider produced nothing usable.
    pub fn reply_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Metrics for provider operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderMetrics {
    pub request_count: u64,
    pub token_count: u64,
    pub error_count: u64,
}

/// Parameters for a single-turn generation request.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl<'a> ChatRequest<'a> {
    pub fn new(prompt: &'a str, max_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt,
            max_tokens,
            temperature,
        }
    }
}

/// A generative-text backend.
///
/// Errors should carry a [`crate::errors::RelayError`] where the failure kind
/// matters; `RelayError::RateLimit` is treated as a quota signal.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(&self, req: ChatRequest<'_>) -> anyhow::Result<LLMResponse>;

    fn default_model(&self) -> &str;

    /// Return accumulated provider metrics (requests, tokens, errors).
    /// Default returns zeroed metrics for providers that don't track them.
    fn metrics(&self) -> ProviderMetrics {
        ProviderMetrics::default()
    }
}

#[cfg(test)]
mod tests;
