//! Admission gate for inbound webhook events.
//!
//! Two independent checks run for every event: message-id deduplication
//! (webhook redeliveries) and a per-sender cooldown. Both records are bounded
//! LRU maps so a long-running process does not grow without limit.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::bus::InboundEvent;
use crate::config::AdmissionConfig;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// The message id was already admitted once.
    DuplicateDropped,
    /// The sender's previous processed message is younger than the cooldown.
    RateLimited,
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        matches!(self, Self::Admitted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::DuplicateDropped => "duplicate",
            Self::RateLimited => "rate_limited",
        }
    }
}

impl std::fmt::Display for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct AdmissionState {
    /// message id -> when it was first admitted
    seen: LruCache<String, Instant>,
    /// sender id -> when its last message was processed
    last_processed: LruCache<String, Instant>,
}

pub struct AdmissionGate {
    state: Mutex<AdmissionState>,
    cooldown: Duration,
    dedup_ttl: Duration,
}

impl AdmissionGate {
    pub fn new(config: &AdmissionConfig) -> Self {
        let dedup_capacity = NonZeroUsize::new(config.dedup_capacity).unwrap_or(NonZeroUsize::MIN);
        let sender_capacity =
            NonZeroUsize::new(config.sender_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(AdmissionState {
                seen: LruCache::new(dedup_capacity),
                last_processed: LruCache::new(sender_capacity),
            }),
            cooldown: Duration::from_millis(config.cooldown_ms),
            dedup_ttl: Duration::from_secs(config.dedup_ttl_secs),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Decide whether `event` should be processed now.
    pub fn admit(&self, event: &InboundEvent) -> Admission {
        self.admit_at(event, Instant::now())
    }

    /// Decide whether `event` should be processed at `now`.
    ///
    /// Dedup runs first and marks the id seen even when the sender is then
    /// rate limited, so a redelivery of a throttled message stays dropped.
    /// Both records are updated under one lock.
    pub fn admit_at(&self, event: &InboundEvent, now: Instant) -> Admission {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(first_seen) = state.seen.get(&event.message_id).copied() {
            if now.saturating_duration_since(first_seen) < self.dedup_ttl {
                debug!("admission: duplicate message id={}", event.message_id);
                return Admission::DuplicateDropped;
            }
            debug!(
                "admission: dedup entry for id={} expired, treating as new",
                event.message_id
            );
        }
        state.seen.put(event.message_id.clone(), now);

        if let Some(last) = state.last_processed.peek(&event.sender_id).copied()
            && now.saturating_duration_since(last) < self.cooldown
        {
            debug!(
                "admission: sender {} within cooldown ({}ms since last)",
                event.sender_id,
                now.saturating_duration_since(last).as_millis()
            );
            return Admission::RateLimited;
        }
        self.make_room_for_sender(&mut state.last_processed, &event.sender_id, now);
        state.last_processed.put(event.sender_id.clone(), now);

        Admission::Admitted
    }

    /// Grow the sender record instead of evicting a sender still in cooldown.
    ///
    /// Entries are only refreshed by `put`, so the LRU entry holds the oldest
    /// admission. Once that one is past its cooldown, evicting it cannot change
    /// a later decision.
    fn make_room_for_sender(
        &self,
        senders: &mut LruCache<String, Instant>,
        sender_id: &str,
        now: Instant,
    ) {
        if senders.len() < senders.cap().get() || senders.contains(sender_id) {
            return;
        }
        let oldest_in_cooldown = senders
            .peek_lru()
            .is_some_and(|(_, last)| now.saturating_duration_since(*last) < self.cooldown);
        if oldest_in_cooldown {
            let grown = senders.cap().saturating_add(senders.len());
            warn!(
                "admission: {} senders inside one cooldown window, growing sender record to {}",
                senders.len(),
                grown
            );
            senders.resize(grown);
        }
    }

    /// Number of remembered message ids.
    pub fn seen_len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .seen
            .len()
    }

    /// Number of senders with a cooldown entry.
    pub fn tracked_senders(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last_processed
            .len()
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("cooldown", &self.cooldown)
            .field("dedup_ttl", &self.dedup_ttl)
            .finish_non_exhaustive()
    }
}
