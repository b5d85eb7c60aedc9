pub mod credentials;
pub mod loader;
pub mod schema;

pub use loader::{get_config_path, load_config, save_config};
pub use schema::{
    AdmissionConfig, CircuitBreakerConfig, Config, DEFAULT_FALLBACK_REPLY, GatewayConfig,
    GeminiConfig, MAX_QUOTA_COOLDOWN_SECS, WhatsAppConfig,
};
