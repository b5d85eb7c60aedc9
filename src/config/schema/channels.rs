use serde::{Deserialize, Serialize};

fn default_graph_api_version() -> String {
    "v21.0".to_string()
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

/// WhatsApp Cloud API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Token echoed during the webhook subscription handshake.
    #[serde(default, rename = "verifyToken")]
    pub verify_token: String,
    /// Bearer token used when sending messages.
    #[serde(default, rename = "accessToken")]
    pub access_token: String,
    #[serde(default, rename = "phoneNumberId")]
    pub phone_number_id: String,
    /// App secret for `X-Hub-Signature-256` validation. Empty disables the check.
    #[serde(default, rename = "appSecret")]
    pub app_secret: String,
    #[serde(default = "default_graph_api_version", rename = "graphApiVersion")]
    pub graph_api_version: String,
    #[serde(default = "default_graph_api_base", rename = "apiBase")]
    pub api_base: String,
}

redact_debug!(
    WhatsAppConfig,
    redact(verify_token),
    redact(access_token),
    phone_number_id,
    redact(app_secret),
    graph_api_version,
    api_base,
);

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            verify_token: String::new(),
            access_token: String::new(),
            phone_number_id: String::new(),
            app_secret: String::new(),
            graph_api_version: default_graph_api_version(),
            api_base: default_graph_api_base(),
        }
    }
}
