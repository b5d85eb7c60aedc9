use crate::config::{CircuitBreakerConfig, GeminiConfig};
use crate::errors::RelayError;
use crate::providers::base::{ChatRequest, LLMProvider, ProviderMetrics};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Deadline used when `now + quota_cooldown` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Result of asking the breaker for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    Text(String),
    /// Circuit is open, or this call just tripped it.
    BackendUnavailable,
    /// Any non-quota failure: timeout, transport error, malformed or empty reply.
    BackendError(String),
}

impl GenerateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::BackendUnavailable => "backend_unavailable",
            Self::BackendError(_) => "backend_error",
        }
    }
}

/// Serializable view of the breaker for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub open: bool,
    #[serde(rename = "remainingSecs")]
    pub remaining_secs: u64,
}

/// Guards the generative backend after quota exhaustion.
///
/// A single quota signal (HTTP 429 / `RESOURCE_EXHAUSTED`) blocks every call
/// for `quota_cooldown`. Other failures pass through as
/// [`GenerateOutcome::BackendError`] and leave the circuit alone, since they
/// are per-request rather than process-wide.
pub struct QuotaCircuitBreaker {
    inner: Arc<dyn LLMProvider>,
    blocked_until: Mutex<Option<Instant>>,
    quota_cooldown: Duration,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl QuotaCircuitBreaker {
    pub fn new(
        inner: Arc<dyn LLMProvider>,
        breaker: &CircuitBreakerConfig,
        gemini: &GeminiConfig,
    ) -> Self {
        Self {
            inner,
            blocked_until: Mutex::new(None),
            quota_cooldown: Duration::from_secs(breaker.quota_cooldown_secs),
            timeout: Duration::from_secs(gemini.timeout_secs),
            temperature: gemini.temperature,
            max_tokens: gemini.max_output_tokens,
        }
    }

    /// Time left until the backend may be contacted again, `None` when closed.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        let blocked_until = *self
            .blocked_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        blocked_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.remaining_at(Instant::now())
    }

    pub fn is_open(&self) -> bool {
        self.remaining().is_some()
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let remaining = self.remaining();
        BreakerSnapshot {
            open: remaining.is_some(),
            // round up so an open circuit never reports 0
            remaining_secs: remaining
                .map_or(0, |d| d.as_secs() + u64::from(d.subsec_nanos() > 0)),
        }
    }

    pub fn provider_metrics(&self) -> ProviderMetrics {
        self.inner.metrics()
    }

    /// Model name of the wrapped backend.
    pub fn model(&self) -> &str {
        self.inner.default_model()
    }

    fn trip(&self, now: Instant) {
        let until = now
            .checked_add(self.quota_cooldown)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let mut blocked_until = self
            .blocked_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // concurrent quota failures keep the later deadline
        if blocked_until.is_none_or(|current| current < until) {
            *blocked_until = Some(until);
        }
    }

    pub async fn try_generate(&self, prompt: &str) -> GenerateOutcome {
        if let Some(remaining) = self.remaining() {
            debug!(
                "circuit open, skipping backend ({}s remaining)",
                remaining.as_secs()
            );
            return GenerateOutcome::BackendUnavailable;
        }

        let req = ChatRequest::new(prompt, self.max_tokens, self.temperature);
        let result = tokio::time::timeout(self.timeout, self.inner.chat(req)).await;

        match result {
            Err(_) => {
                warn!(
                    "backend call timed out after {}s",
                    self.timeout.as_secs_f32()
                );
                GenerateOutcome::BackendError("timeout".to_string())
            }
            Ok(Err(e)) => {
                let quota = e
                    .downcast_ref::<RelayError>()
                    .is_some_and(RelayError::is_quota);
                if quota {
                    self.trip(Instant::now());
                    warn!(
                        "backend quota exhausted, circuit open for {}s",
                        self.quota_cooldown.as_secs()
                    );
                    GenerateOutcome::BackendUnavailable
                } else {
                    let retryable = e
                        .downcast_ref::<RelayError>()
                        .is_none_or(RelayError::is_retryable);
                    if retryable {
                        warn!("backend error: {:#}", e);
                    } else {
                        error!("backend rejected request, check gemini settings: {:#}", e);
                    }
                    GenerateOutcome::BackendError(e.to_string())
                }
            }
            Ok(Ok(response)) => match response.reply_text() {
                Some(text) => GenerateOutcome::Text(text.to_string()),
                None => {
                    info!("backend returned no usable text");
                    GenerateOutcome::BackendError("empty reply".to_string())
                }
            },
        }
    }
}
