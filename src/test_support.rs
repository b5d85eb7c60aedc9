//! Scripted backend and recording channel shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::bus::OutboundMessage;
use crate::channels::base::BaseChannel;
use crate::errors::RelayError;
use crate::providers::base::{ChatRequest, LLMProvider, LLMResponse};

/// What the scripted backend does on its next call.
pub(crate) enum Step {
    Reply(&'static str),
    Quota,
    Fail(RelayError),
    Hang,
}

/// Plays `steps` in order, then echoes the prompt.
pub(crate) struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
    last_max_tokens: AtomicU32,
}

impl ScriptedProvider {
    pub(crate) fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicU32::new(0),
            last_max_tokens: AtomicU32::new(0),
        })
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_max_tokens(&self) -> u32 {
        self.last_max_tokens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(&self, req: ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_max_tokens.store(req.max_tokens, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => Ok(LLMResponse::text(format!("echo: {}", req.prompt))),
            Some(Step::Reply(text)) => Ok(LLMResponse::text(text)),
            Some(Step::Quota) => Err(RelayError::RateLimit { retry_after: None }.into()),
            Some(Step::Fail(e)) => Err(e.into()),
            Some(Step::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    fn default_model(&self) -> &'static str {
        "scripted"
    }
}

/// Records every send; `failing()` rejects them after recording.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    sent: Mutex<Vec<OutboundMessage>>,
    fail: bool,
}

impl RecordingChannel {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub(crate) fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(msg.clone());
        if self.fail {
            anyhow::bail!("graph api down");
        }
        Ok(())
    }
}
