use super::*;

#[test]
fn reply_text_trims_content() {
    let resp = LLMResponse::text("  hi!\n");
    assert_eq!(resp.reply_text(), Some("hi!"));
}

#[test]
fn reply_text_none_for_blank_or_missing() {
    assert_eq!(LLMResponse::text("   ").reply_text(), None);
    let empty = LLMResponse {
        content: None,
        total_tokens: Some(3),
    };
    assert_eq!(empty.reply_text(), None);
}

#[test]
fn chat_request_new_carries_generation_settings() {
    let req = ChatRequest::new("hello", 200, 0.7);
    assert_eq!(req.prompt, "hello");
    assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(req.max_tokens, 200);
}

struct NoopProvider;

#[async_trait]
impl LLMProvider for NoopProvider {
    async fn chat(&self, _req: ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
        Ok(LLMResponse::text("ok"))
    }

    fn default_model(&self) -> &'static str {
        "noop"
    }
}

#[tokio::test]
async fn default_metrics_are_zero() {
    let provider = NoopProvider;
    let resp = provider.chat(ChatRequest::new("x", 10, 0.0)).await.unwrap();
    assert_eq!(resp.reply_text(), Some("ok"));
    assert_eq!(provider.metrics(), ProviderMetrics::default());
}
