use serde::{Deserialize, Serialize};
use tracing::warn;

/// Generates a `Debug` impl that redacts secret fields.
///
/// Field specifiers:
/// - `field_name`           : printed normally via `&self.field_name`
/// - `redact(field_name)`   : `String` field: shows `[empty]` or `[REDACTED]`
macro_rules! redact_debug {
    // Internal: emit a single .field() call
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    // Internal: recursive TT muncher
    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    // Entry point
    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

// Submodules: declared after the macro so they can use `redact_debug!`
mod channels;
mod providers;

pub use channels::*;
pub use providers::*;

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

fn default_cooldown_ms() -> u64 {
    4000
}

fn default_dedup_capacity() -> usize {
    10_000
}

fn default_dedup_ttl_secs() -> u64 {
    86_400
}

fn default_sender_capacity() -> usize {
    10_000
}

/// Deduplication and per-sender throttling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Minimum interval between two processed messages of the same sender.
    #[serde(default = "default_cooldown_ms", rename = "cooldownMs")]
    pub cooldown_ms: u64,
    /// Maximum number of message ids remembered for deduplication.
    #[serde(default = "default_dedup_capacity", rename = "dedupCapacity")]
    pub dedup_capacity: usize,
    /// How long a message id stays remembered.
    #[serde(default = "default_dedup_ttl_secs", rename = "dedupTtlSecs")]
    pub dedup_ttl_secs: u64,
    /// Maximum number of senders tracked for cooldown.
    #[serde(default = "default_sender_capacity", rename = "senderCapacity")]
    pub sender_capacity: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            dedup_capacity: default_dedup_capacity(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
            sender_capacity: default_sender_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Circuit breaker
// ---------------------------------------------------------------------------

fn default_quota_cooldown_secs() -> u64 {
    60
}

/// Upper bound for `circuitBreaker.quotaCooldownSecs` (one day).
pub const MAX_QUOTA_COOLDOWN_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// How long backend calls are suppressed after a quota error.
    #[serde(
        default = "default_quota_cooldown_secs",
        rename = "quotaCooldownSecs"
    )]
    pub quota_cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            quota_cooldown_secs: default_quota_cooldown_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

pub const DEFAULT_FALLBACK_REPLY: &str =
    "🤖 I'm handling a high volume of requests right now. Please try again in a moment.";

fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default, rename = "circuitBreaker")]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Sent instead of a generated reply whenever the backend cannot answer.
    #[serde(default = "default_fallback_reply", rename = "fallbackReply")]
    pub fallback_reply: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            whatsapp: WhatsAppConfig::default(),
            gemini: GeminiConfig::default(),
            gateway: GatewayConfig::default(),
            admission: AdmissionConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), crate::errors::RelayError> {
        self.validate_gemini()?;
        self.validate_gateway()?;
        self.validate_admission()?;
        self.validate_circuit_breaker()?;
        if self.fallback_reply.trim().is_empty() {
            return Err(crate::errors::RelayError::Config(
                "fallbackReply must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Fail when any credential the relay cannot run without is missing.
    pub fn require_credentials(&self) -> Result<(), crate::errors::RelayError> {
        let missing = self.missing_credentials();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(crate::errors::RelayError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }

    /// Names of required credentials that are currently empty.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let required = [
            ("whatsapp.verifyToken", &self.whatsapp.verify_token),
            ("whatsapp.accessToken", &self.whatsapp.access_token),
            ("whatsapp.phoneNumberId", &self.whatsapp.phone_number_id),
            ("gemini.apiKey", &self.gemini.api_key),
        ];
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    fn validate_gemini(&self) -> Result<(), crate::errors::RelayError> {
        use crate::errors::RelayError;
        let g = &self.gemini;

        if g.model.trim().is_empty() {
            return Err(RelayError::Config("gemini.model must not be empty".into()));
        }
        if g.max_output_tokens == 0 {
            return Err(RelayError::Config(
                "gemini.maxOutputTokens must be > 0".into(),
            ));
        }
        if g.temperature.is_nan()
            || g.temperature.is_infinite()
            || g.temperature < 0.0
            || g.temperature > 2.0
        {
            return Err(RelayError::Config(
                "gemini.temperature must be a finite number between 0.0 and 2.0".into(),
            ));
        }
        if g.timeout_secs == 0 {
            return Err(RelayError::Config("gemini.timeoutSecs must be > 0".into()));
        }
        if g.timeout_secs > 20 {
            warn!(
                "gemini.timeoutSecs is {}s; WhatsApp redelivers webhooks that are not acknowledged promptly",
                g.timeout_secs
            );
        }
        Ok(())
    }

    fn validate_gateway(&self) -> Result<(), crate::errors::RelayError> {
        use crate::errors::RelayError;

        if self.gateway.port == 0 {
            return Err(RelayError::Config("gateway.port must be > 0".into()));
        }
        if self.gateway.port < 1024 {
            warn!(
                "gateway.port {} is a privileged port (< 1024), may require elevated permissions",
                self.gateway.port
            );
        }
        Ok(())
    }

    fn validate_admission(&self) -> Result<(), crate::errors::RelayError> {
        use crate::errors::RelayError;
        let a = &self.admission;

        if a.dedup_capacity == 0 {
            return Err(RelayError::Config(
                "admission.dedupCapacity must be > 0".into(),
            ));
        }
        if a.sender_capacity == 0 {
            return Err(RelayError::Config(
                "admission.senderCapacity must be > 0".into(),
            ));
        }
        if a.dedup_ttl_secs == 0 {
            return Err(RelayError::Config(
                "admission.dedupTtlSecs must be > 0".into(),
            ));
        }
        if a.dedup_ttl_secs < 3600 {
            warn!(
                "admission.dedupTtlSecs is short ({}s); late webhook redeliveries may be answered twice",
                a.dedup_ttl_secs
            );
        }
        Ok(())
    }

    fn validate_circuit_breaker(&self) -> Result<(), crate::errors::RelayError> {
        use crate::errors::RelayError;

        if self.circuit_breaker.quota_cooldown_secs > MAX_QUOTA_COOLDOWN_SECS {
            return Err(RelayError::Config(format!(
                "circuitBreaker.quotaCooldownSecs must be <= {}",
                MAX_QUOTA_COOLDOWN_SECS
            )));
        }
        if self.circuit_breaker.quota_cooldown_secs == 0 {
            warn!("circuitBreaker.quotaCooldownSecs is 0; quota errors will not pause backend calls");
        }
        Ok(())
    }
}
