// Shared test helpers: not all items used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use chatrelay::bus::{InboundEvent, OutboundMessage};
use chatrelay::channels::base::BaseChannel;
use chatrelay::config::Config;
use chatrelay::errors::RelayError;
use chatrelay::providers::base::{ChatRequest, LLMProvider, LLMResponse};
use chatrelay::relay::ReplyResolver;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the mock backend does on its next call.
#[derive(Debug, Clone)]
pub enum BackendStep {
    Reply(String),
    Quota,
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub struct MockLLMProvider {
    steps: Mutex<VecDeque<BackendStep>>,
    pub calls: Mutex<Vec<RecordedCall>>,
    pub default_response: String,
}

impl MockLLMProvider {
    pub fn with_steps(steps: Vec<BackendStep>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::from(steps)),
            calls: Mutex::new(Vec::new()),
            default_response: "Mock response".to_string(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn chat(&self, req: ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: req.prompt.to_string(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        });

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => Ok(LLMResponse::text(self.default_response.clone())),
            Some(BackendStep::Reply(text)) => Ok(LLMResponse::text(text)),
            Some(BackendStep::Quota) => Err(RelayError::RateLimit { retry_after: None }.into()),
            Some(BackendStep::Fail(msg)) => Err(RelayError::Provider {
                message: msg,
                retryable: true,
            }
            .into()),
        }
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}

/// Channel that records every send and optionally fails them.
#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub fail: bool,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(msg.clone());
        if self.fail {
            anyhow::bail!("delivery refused");
        }
        Ok(())
    }
}

pub const FALLBACK: &str = "temporarily unavailable";

pub fn test_config() -> Config {
    Config {
        fallback_reply: FALLBACK.to_string(),
        ..Config::default()
    }
}

pub fn make_resolver(
    provider: Arc<MockLLMProvider>,
    channel: Arc<RecordingChannel>,
) -> ReplyResolver {
    ReplyResolver::from_config(&test_config(), provider, channel)
}

pub fn event(id: &str, from: &str, text: &str) -> InboundEvent {
    InboundEvent::new(id, from, text)
}

/// A Cloud API webhook body carrying one text message.
pub fn text_delivery(id: &str, from: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"phone_number_id": "PN"},
                    "messages": [{
                        "from": from,
                        "id": id,
                        "timestamp": "1717000000",
                        "type": "text",
                        "text": {"body": body}
                    }]
                }
            }]
        }]
    })
}
