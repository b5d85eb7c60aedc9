use crate::bus::OutboundMessage;
use async_trait::async_trait;

/// Outbound delivery capability for a chat platform.
#[async_trait]
pub trait BaseChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one message. Errors describe the failure; callers decide
    /// whether to log, retry or drop.
    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()>;
}
