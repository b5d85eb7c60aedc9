use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user-originated chat message extracted from a webhook delivery.
///
/// `message_id` is unique per message but the transport may deliver the same
/// event more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub message_id: String,
    pub sender_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    pub fn new(
        message_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            sender_id: sender_id.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// A reply addressed to a chat recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient_id: String,
    pub content: String,
}

impl OutboundMessage {
    pub fn new(recipient_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            content: content.into(),
        }
    }
}
