//! Reply resolution: admission, generation with fallback, delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::admission::{Admission, AdmissionGate};
use crate::bus::{InboundEvent, OutboundMessage};
use crate::channels::base::BaseChannel;
use crate::config::Config;
use crate::providers::base::LLMProvider;
use crate::providers::circuit_breaker::{GenerateOutcome, QuotaCircuitBreaker};

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// A reply was handed to the channel exactly once.
    Sent {
        /// The reply was the fixed fallback text rather than generated.
        fallback: bool,
        /// The channel accepted the message.
        delivered: bool,
    },
    /// Dropped by the admission gate; nothing was generated or sent.
    Suppressed(Admission),
}

impl ResolveOutcome {
    pub fn is_sent(self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

#[derive(Debug, Default)]
struct RelayStats {
    admitted: AtomicU64,
    duplicates: AtomicU64,
    rate_limited: AtomicU64,
    generated: AtomicU64,
    fallbacks: AtomicU64,
    delivery_failures: AtomicU64,
}

impl RelayStats {
    fn record(&self, admission: Admission) {
        let counter = match admission {
            Admission::Admitted => &self.admitted,
            Admission::DuplicateDropped => &self.duplicates,
            Admission::RateLimited => &self.rate_limited,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatsSnapshot {
    pub admitted: u64,
    pub duplicates: u64,
    pub rate_limited: u64,
    pub generated: u64,
    pub fallbacks: u64,
    pub delivery_failures: u64,
}

/// Drives one inbound event to completion.
///
/// Never returns an error: backend failures become the fallback reply and
/// delivery failures are logged and counted.
pub struct ReplyResolver {
    gate: AdmissionGate,
    breaker: QuotaCircuitBreaker,
    channel: Arc<dyn BaseChannel>,
    fallback_reply: String,
    stats: RelayStats,
}

impl ReplyResolver {
    pub fn new(
        gate: AdmissionGate,
        breaker: QuotaCircuitBreaker,
        channel: Arc<dyn BaseChannel>,
        fallback_reply: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            breaker,
            channel,
            fallback_reply: fallback_reply.into(),
            stats: RelayStats::default(),
        }
    }

    pub fn from_config(
        config: &Config,
        provider: Arc<dyn LLMProvider>,
        channel: Arc<dyn BaseChannel>,
    ) -> Self {
        Self::new(
            AdmissionGate::new(&config.admission),
            QuotaCircuitBreaker::new(provider, &config.circuit_breaker, &config.gemini),
            channel,
            config.fallback_reply.clone(),
        )
    }

    pub fn breaker(&self) -> &QuotaCircuitBreaker {
        &self.breaker
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn fallback_reply(&self) -> &str {
        &self.fallback_reply
    }

    pub fn stats(&self) -> RelayStatsSnapshot {
        let s = &self.stats;
        RelayStatsSnapshot {
            admitted: s.admitted.load(Ordering::Relaxed),
            duplicates: s.duplicates.load(Ordering::Relaxed),
            rate_limited: s.rate_limited.load(Ordering::Relaxed),
            generated: s.generated.load(Ordering::Relaxed),
            fallbacks: s.fallbacks.load(Ordering::Relaxed),
            delivery_failures: s.delivery_failures.load(Ordering::Relaxed),
        }
    }

    pub async fn resolve(&self, event: &InboundEvent) -> ResolveOutcome {
        let admission = self.gate.admit(event);
        self.stats.record(admission);
        if !admission.is_admitted() {
            debug!(
                "suppressing message {} from {}: {}",
                event.message_id, event.sender_id, admission
            );
            return ResolveOutcome::Suppressed(admission);
        }

        info!(
            "message {} from {} ({} chars)",
            event.message_id,
            event.sender_id,
            event.text.chars().count()
        );

        let outcome = self.breaker.try_generate(&event.text).await;
        let (reply, fallback) = match outcome {
            GenerateOutcome::Text(text) => {
                self.stats.generated.fetch_add(1, Ordering::Relaxed);
                (text, false)
            }
            other => {
                self.stats.fallbacks.fetch_add(1, Ordering::Relaxed);
                info!(
                    "using fallback reply for {} ({})",
                    event.message_id,
                    other.as_str()
                );
                (self.fallback_reply.clone(), true)
            }
        };

        let msg = OutboundMessage::new(event.sender_id.clone(), reply);
        let delivered = match self.channel.send(&msg).await {
            Ok(()) => true,
            Err(e) => {
                self.stats.delivery_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "{}: failed to deliver reply to {}: {:#}",
                    self.channel.name(),
                    event.sender_id,
                    e
                );
                false
            }
        };

        ResolveOutcome::Sent {
            fallback,
            delivered,
        }
    }
}
