#![warn(clippy::pedantic)]
// Noisy doc/signature lints: would require annotating every pub function
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference: keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// Millisecond/second conversions for config values and health output
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

pub mod admission;
pub mod bus;
pub mod channels;
pub mod cli;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod providers;
pub mod relay;
pub(crate) mod utils;

#[cfg(test)]
mod test_support;

/// Re-exports for fuzz targets. Not part of the public API.
#[doc(hidden)]
pub mod fuzz_api {
    pub use crate::channels::whatsapp::extract_inbound_event;

    /// Wrapper around `gateway::validate_webhook_signature` for fuzz targets.
    pub fn validate_webhook_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
        crate::gateway::validate_webhook_signature(secret, signature, body)
    }
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
