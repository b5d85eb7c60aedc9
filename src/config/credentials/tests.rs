use super::*;

#[test]
fn test_credential_names_match_env_vars() {
    assert_eq!(CREDENTIAL_NAMES.len(), CREDENTIAL_ENV_VARS.len());
    for (name, env) in CREDENTIAL_ENV_VARS {
        assert!(CREDENTIAL_NAMES.contains(name));
        assert!(env.starts_with("CHATRELAY_"));
    }
}

#[test]
fn test_get_credential_value_unknown_slot() {
    let config = Config::default();
    assert!(get_credential_value(&config, "no-such-slot").is_none());
}

#[test]
fn test_env_override_sets_verify_token() {
    let mut config = Config::default();
    assert!(config.whatsapp.verify_token.is_empty());

    unsafe { std::env::set_var("CHATRELAY_VERIFY_TOKEN", "from-env") };
    apply_env_overrides(&mut config);
    assert_eq!(config.whatsapp.verify_token, "from-env");
    assert!(is_credential_set(&config, "verify-token"));

    unsafe { std::env::remove_var("CHATRELAY_VERIFY_TOKEN") };
}

#[test]
fn test_empty_env_var_does_not_override() {
    let mut config = Config::default();
    config.whatsapp.app_secret = "original".to_string();

    unsafe { std::env::set_var("CHATRELAY_APP_SECRET", "") };
    apply_env_overrides(&mut config);
    assert_eq!(config.whatsapp.app_secret, "original");

    unsafe { std::env::remove_var("CHATRELAY_APP_SECRET") };
}

#[test]
fn test_port_override_parses_and_ignores_garbage() {
    let mut config = Config::default();

    unsafe { std::env::set_var(PORT_ENV_VAR, "8088") };
    apply_env_overrides(&mut config);
    assert_eq!(config.gateway.port, 8088);

    unsafe { std::env::set_var(PORT_ENV_VAR, "not-a-port") };
    apply_env_overrides(&mut config);
    assert_eq!(config.gateway.port, 8088);

    unsafe { std::env::remove_var(PORT_ENV_VAR) };
}

#[test]
fn test_is_credential_set_ignores_whitespace() {
    let mut config = Config::default();
    config.gemini.api_key = "   ".into();
    assert!(!is_credential_set(&config, "gemini-api-key"));
    config.gemini.api_key = "key".into();
    assert!(is_credential_set(&config, "gemini-api-key"));
}
