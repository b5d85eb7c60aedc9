use crate::config::GeminiConfig;
use crate::providers::base::{ChatRequest, LLMProvider, LLMResponse, ProviderMetrics};
use crate::providers::errors::ProviderErrorHandler;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, PoisonError};

/// Header carrying the API key. The key stays out of the URL, which reqwest
/// includes in transport errors.
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    metrics: Arc<Mutex<ProviderMetrics>>,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Self {
        Self::with_base_url(
            config.api_key.clone(),
            config.model.clone(),
            config.api_base.trim_end_matches('/').to_string(),
        )
    }

    pub(crate) fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
            client: crate::providers::provider_http_client(),
            metrics: Arc::new(Mutex::new(ProviderMetrics::default())),
        }
    }

    /// Pull the reply out of `candidates[0].content.parts[*].text`.
    fn parse_response(json: &Value) -> Result<LLMResponse> {
        let candidate = json["candidates"]
            .as_array()
            .and_then(|arr| arr.first())
            .context("No candidates in Gemini response")?;

        let content = candidate["content"]["parts"].as_array().and_then(|parts| {
            parts
                .iter()
                .find_map(|p| p["text"].as_str().map(std::string::ToString::to_string))
        });

        let total_tokens = json
            .get("usageMetadata")
            .and_then(|u| u.get("totalTokenCount"))
            .and_then(Value::as_u64);

        Ok(LLMResponse {
            content,
            total_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn chat(&self, req: ChatRequest<'_>) -> Result<LLMResponse> {
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": req.prompt}]
            }],
            "generationConfig": {
                "temperature": req.temperature,
                "maxOutputTokens": req.max_tokens,
            },
        });

        let resp = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let json = ProviderErrorHandler::check_response(resp, "Gemini", &self.metrics).await?;
        let response = Self::parse_response(&json)?;

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.request_count += 1;
            metrics.token_count += response.total_tokens.unwrap_or(0);
        }

        Ok(response)
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn metrics(&self) -> ProviderMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
