#![no_main]

use chatrelay::fuzz_api::extract_inbound_event;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = serde_json::from_slice::<serde_json::Value>(data)
        && let Some(event) = extract_inbound_event(&payload)
    {
        assert!(!event.message_id.is_empty());
        assert!(!event.sender_id.is_empty());
        assert_eq!(event.text.trim(), event.text);
        assert!(!event.text.is_empty());
    }
});
