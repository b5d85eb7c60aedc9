use super::schema::Config;
use tracing::{debug, warn};

macro_rules! define_credentials {
    ($( $name:literal, $env:literal => $($path:ident).+ );* $(;)?) => {
        /// All known credential slot names.
        pub const CREDENTIAL_NAMES: &[&str] = &[$($name),*];

        /// (slot name, env var name) pairs.
        pub const CREDENTIAL_ENV_VARS: &[(&str, &str)] = &[$(($name, $env)),*];

        /// Get the current value of a credential field by slot name.
        pub fn get_credential_value<'a>(config: &'a Config, name: &str) -> Option<&'a str> {
            match name {
                $($name => Some(config.$($path).+.as_str()),)*
                _ => None,
            }
        }

        /// Apply string environment variable overrides.
        ///
        /// Any `CHATRELAY_*` env var that is set and non-empty will overwrite the
        /// corresponding config field, allowing secrets to be injected without
        /// touching the config file (useful for containers and CI).
        fn apply_string_overrides(config: &mut Config) {
            $(
                if let Ok(val) = std::env::var($env) {
                    if !val.is_empty() {
                        debug!("{} overridden from {}", $name, $env);
                        config.$($path).+ = val;
                    }
                }
            )*
        }
    };
}

define_credentials! {
    "verify-token",     "CHATRELAY_VERIFY_TOKEN"     => whatsapp.verify_token;
    "whatsapp-token",   "CHATRELAY_WHATSAPP_TOKEN"   => whatsapp.access_token;
    "phone-number-id",  "CHATRELAY_PHONE_NUMBER_ID"  => whatsapp.phone_number_id;
    "app-secret",       "CHATRELAY_APP_SECRET"       => whatsapp.app_secret;
    "gemini-api-key",   "CHATRELAY_GEMINI_API_KEY"   => gemini.api_key;
    "gemini-model",     "CHATRELAY_GEMINI_MODEL"     => gemini.model;
}

/// Env var overriding `gateway.port`.
pub const PORT_ENV_VAR: &str = "CHATRELAY_PORT";

/// Apply all environment overrides (credentials, model, port).
pub fn apply_env_overrides(config: &mut Config) {
    apply_string_overrides(config);

    if let Ok(val) = std::env::var(PORT_ENV_VAR)
        && !val.is_empty()
    {
        match val.parse::<u16>() {
            Ok(port) => config.gateway.port = port,
            Err(_) => warn!("ignoring {}={:?}: not a valid port", PORT_ENV_VAR, val),
        }
    }
}

/// Whether the named credential slot holds a non-empty value.
pub fn is_credential_set(config: &Config, name: &str) -> bool {
    get_credential_value(config, name).is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests;
