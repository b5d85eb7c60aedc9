use serde::{Deserialize, Serialize};

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    200
}

fn default_timeout_secs() -> u64 {
    8
}

/// Google Gemini backend settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, rename = "apiKey")]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_api_base", rename = "apiBase")]
    pub api_base: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens", rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
    /// Hard limit for one generation call; exceeded calls get the fallback reply.
    #[serde(default = "default_timeout_secs", rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

redact_debug!(
    GeminiConfig,
    redact(api_key),
    model,
    api_base,
    temperature,
    max_output_tokens,
    timeout_secs,
);

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            api_base: default_gemini_api_base(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
