/// HTTP server for the WhatsApp Cloud API webhook.
///
/// `GET /webhook` answers Meta's subscription handshake, `POST /webhook`
/// receives message deliveries and hands them to the [`ReplyResolver`], and
/// `GET /api/health` reports breaker state and relay counters.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use crate::channels::whatsapp::extract_inbound_event;
use crate::config::WhatsAppConfig;
use crate::relay::ReplyResolver;

type HmacSha256 = Hmac<Sha256>;

/// Max webhook payload size: 1 MB.
const WEBHOOK_MAX_BODY: usize = 1_048_576;

const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct GatewayState {
    resolver: Arc<ReplyResolver>,
    verify_token: Arc<str>,
    /// Empty disables payload signature checks.
    app_secret: Arc<str>,
}

impl GatewayState {
    pub fn new(resolver: Arc<ReplyResolver>, whatsapp: &WhatsAppConfig) -> Self {
        Self {
            resolver,
            verify_token: Arc::from(whatsapp.verify_token.as_str()),
            app_secret: Arc::from(whatsapp.app_secret.as_str()),
        }
    }

    pub fn resolver(&self) -> &Arc<ReplyResolver> {
        &self.resolver
    }
}

/// Build the gateway router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/webhook",
            get(verify_handler)
                .post(webhook_handler)
                .layer(DefaultBodyLimit::max(WEBHOOK_MAX_BODY)),
        )
        .route("/api/health", get(health_handler))
        .with_state(state)
}

/// GET /webhook: subscription handshake.
///
/// Echoes `hub.challenge` only when `hub.mode` is `subscribe` and
/// `hub.verify_token` matches the configured token.
async fn verify_handler(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map_or("", String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    let token_ok = !state.verify_token.is_empty()
        && bool::from(token.as_bytes().ct_eq(state.verify_token.as_bytes()));

    if mode == Some("subscribe") && token_ok {
        info!("webhook subscription verified");
        (StatusCode::OK, challenge).into_response()
    } else {
        warn!("webhook verification rejected (mode={:?})", mode);
        StatusCode::FORBIDDEN.into_response()
    }
}

/// Validate an HMAC-SHA256 signature against a payload.
pub(crate) fn validate_webhook_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    // Meta sends "sha256=<hex>"; accept bare hex too
    let sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    expected.as_bytes().ct_eq(sig.as_bytes()).into()
}

/// POST /webhook: inbound message delivery.
///
/// Everything that passes the transport checks is acknowledged with 200,
/// including dropped events and internal failures, so Meta never redelivers
/// an event the admission gate would only discard. Bodies over
/// `WEBHOOK_MAX_BODY` are rejected with 413 by the route's body limit.
async fn webhook_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if !state.app_secret.is_empty() {
        let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok())
        else {
            warn!("webhook: missing {} header", SIGNATURE_HEADER);
            return StatusCode::FORBIDDEN;
        };
        if !validate_webhook_signature(&state.app_secret, signature, &body) {
            warn!("webhook: invalid signature");
            return StatusCode::FORBIDDEN;
        }
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("webhook: body is not JSON: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let Some(event) = extract_inbound_event(&payload) else {
        debug!("webhook: no text message in delivery, acknowledging");
        return StatusCode::OK;
    };

    let outcome = state.resolver.resolve(&event).await;
    debug!("webhook: message {} resolved: {:?}", event.message_id, outcome);
    StatusCode::OK
}

/// GET /api/health: status, breaker state and counters.
async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let resolver = &state.resolver;
    let metrics = resolver.breaker().provider_metrics();
    let cooldown_ms = u64::try_from(resolver.gate().cooldown().as_millis()).unwrap_or(u64::MAX);
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "circuitBreaker": resolver.breaker().snapshot(),
        "relay": resolver.stats(),
        "admission": {
            "cooldownMs": cooldown_ms,
            "trackedMessages": resolver.gate().seen_len(),
            "trackedSenders": resolver.gate().tracked_senders(),
        },
        "provider": {
            "model": resolver.breaker().model(),
            "requestCount": metrics.request_count,
            "tokenCount": metrics.token_count,
            "errorCount": metrics.error_count,
        },
    }))
}

/// Bind and serve the gateway in a background task.
pub async fn start(
    host: &str,
    port: u16,
    state: GatewayState,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = build_router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("webhook gateway listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("gateway server error: {}", e);
        }
    });

    Ok(handle)
}
