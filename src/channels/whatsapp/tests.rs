use super::*;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn text_delivery(id: &str, from: &str, body: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA_ID",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"phone_number_id": "PN_ID"},
                    "contacts": [{"wa_id": from, "profile": {"name": "Ana"}}],
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

fn config() -> WhatsAppConfig {
    WhatsAppConfig {
        access_token: "wa-token".to_string(),
        phone_number_id: "123456".to_string(),
        ..WhatsAppConfig::default()
    }
}

// --- extract_inbound_event ---

#[test]
fn test_extract_text_message() {
    let event = extract_inbound_event(&text_delivery("wamid.1", "15551234567", "  hello  "))
        .expect("event");
    assert_eq!(event.message_id, "wamid.1");
    assert_eq!(event.sender_id, "15551234567");
    assert_eq!(event.text, "hello");
    assert_eq!(event.received_at.timestamp(), 1_717_000_000);
}

#[test]
fn test_extract_status_callback_ignored() {
    let payload = json!({
        "entry": [{
            "changes": [{
                "value": {
                    "statuses": [{"id": "wamid.1", "status": "delivered"}]
                }
            }]
        }]
    });
    assert!(extract_inbound_event(&payload).is_none());
}

#[test]
fn test_extract_non_text_message_ignored() {
    let payload = json!({
        "entry": [{
            "changes": [{
                "value": {
                    "messages": [{
                        "from": "15551234567",
                        "id": "wamid.2",
                        "type": "image",
                        "image": {"id": "media-1", "mime_type": "image/jpeg"}
                    }]
                }
            }]
        }]
    });
    assert!(extract_inbound_event(&payload).is_none());
}

#[test]
fn test_extract_blank_body_ignored() {
    assert!(extract_inbound_event(&text_delivery("wamid.3", "1555", "   \n")).is_none());
}

#[test]
fn test_extract_requires_id_and_sender() {
    assert!(extract_inbound_event(&text_delivery("", "1555", "hi")).is_none());
    assert!(extract_inbound_event(&text_delivery("wamid.4", "", "hi")).is_none());
}

#[test]
fn test_extract_malformed_payloads() {
    assert!(extract_inbound_event(&json!({})).is_none());
    assert!(extract_inbound_event(&json!({"entry": []})).is_none());
    assert!(extract_inbound_event(&json!({"entry": "nope"})).is_none());
    assert!(extract_inbound_event(&json!(null)).is_none());
}

#[test]
fn test_extract_bad_timestamp_keeps_receive_time() {
    let mut payload = text_delivery("wamid.5", "1555", "hi");
    payload["entry"][0]["changes"][0]["value"]["messages"][0]["timestamp"] = json!("soon");
    let before = Utc::now();
    let event = extract_inbound_event(&payload).unwrap();
    assert!(event.received_at >= before);
}

// --- send ---

#[tokio::test]
async fn test_send_posts_cloud_api_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v21.0/123456/messages"))
        .and(header("authorization", "Bearer wa-token"))
        .and(body_json(json!({
            "messaging_product": "whatsapp",
            "to": "15551234567",
            "type": "text",
            "text": {"preview_url": false, "body": "hi!"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "wamid.out"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let channel = WhatsAppChannel::with_base_url(&config(), &server.uri());
    channel
        .send(&OutboundMessage::new("15551234567", "hi!"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_error_status_is_err() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid OAuth access token", "code": 190}
        })))
        .mount(&server)
        .await;

    let channel = WhatsAppChannel::with_base_url(&config(), &server.uri());
    let err = channel
        .send(&OutboundMessage::new("1555", "hi"))
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("401"), "{msg}");
    assert!(msg.contains("Invalid OAuth"), "{msg}");
}

#[test]
fn test_payload_truncates_long_body() {
    let long = "a".repeat(MAX_BODY_CHARS + 50);
    let payload = WhatsAppChannel::payload(&OutboundMessage::new("1555", long));
    let body = payload["text"]["body"].as_str().unwrap();
    assert_eq!(body.chars().count(), MAX_BODY_CHARS);
    assert!(body.ends_with('…'));
}

#[test]
fn test_messages_url_from_config() {
    let channel = WhatsAppChannel::new(&config());
    assert_eq!(
        channel.messages_url,
        "https://graph.facebook.com/v21.0/123456/messages"
    );
    assert_eq!(channel.name(), "whatsapp");
}
