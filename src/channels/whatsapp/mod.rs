use crate::bus::{InboundEvent, OutboundMessage};
use crate::channels::base::BaseChannel;
use crate::config::WhatsAppConfig;
use crate::utils::http::{MAX_ERROR_BODY_BYTES, default_http_client, limited_text};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Cloud API rejects text bodies longer than this.
const MAX_BODY_CHARS: usize = 4096;

/// WhatsApp Cloud API delivery over the Graph API.
pub struct WhatsAppChannel {
    access_token: String,
    messages_url: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self::with_base_url(config, &config.api_base)
    }

    pub(crate) fn with_base_url(config: &WhatsAppConfig, base_url: &str) -> Self {
        let messages_url = format!(
            "{}/{}/{}/messages",
            base_url.trim_end_matches('/'),
            config.graph_api_version,
            config.phone_number_id
        );
        Self {
            access_token: config.access_token.clone(),
            messages_url,
            client: default_http_client(),
        }
    }

    fn payload(msg: &OutboundMessage) -> Value {
        let body = if msg.content.chars().count() > MAX_BODY_CHARS {
            crate::utils::preview(&msg.content, MAX_BODY_CHARS - 1)
        } else {
            msg.content.clone()
        };
        json!({
            "messaging_product": "whatsapp",
            "to": msg.recipient_id,
            "type": "text",
            "text": {
                "preview_url": false,
                "body": body,
            },
        })
    }
}

#[async_trait]
impl BaseChannel for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(&Self::payload(msg))
            .send()
            .await
            .context("whatsapp: request to Graph API failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = limited_text(response, MAX_ERROR_BODY_BYTES)
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            warn!("whatsapp: send to {} rejected ({})", msg.recipient_id, status);
            return Err(anyhow::anyhow!("whatsapp API error ({}): {}", status, body));
        }

        debug!(
            "whatsapp: delivered {} chars to {}",
            msg.content.chars().count(),
            msg.recipient_id
        );
        Ok(())
    }
}

/// Extract the first text message from a Cloud API webhook delivery.
///
/// Only `entry[0].changes[0].value.messages[0]` is considered. Returns `None`
/// for status callbacks, non-text messages, blank bodies and entries missing
/// an id or sender.
pub fn extract_inbound_event(payload: &Value) -> Option<InboundEvent> {
    let message = payload
        .get("entry")?
        .get(0)?
        .get("changes")?
        .get(0)?
        .get("value")?
        .get("messages")?
        .get(0)?;

    let text = message.get("text")?.get("body")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    let message_id = message.get("id")?.as_str().filter(|s| !s.is_empty())?;
    let sender_id = message.get("from")?.as_str().filter(|s| !s.is_empty())?;

    let mut event = InboundEvent::new(message_id, sender_id, text);
    if let Some(sent_at) = message
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    {
        event.received_at = sent_at;
    }
    Some(event)
}

#[cfg(test)]
mod tests;
