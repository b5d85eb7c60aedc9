#![no_main]

use chatrelay::config::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<Config>(data) {
        let _ = config.validate();
        let _ = config.missing_credentials();
        let _ = format!("{:?}", config);
    }
});
