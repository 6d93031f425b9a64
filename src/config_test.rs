use super::*;

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__TEST_HUB_NONEXISTENT_KEY__", 42).expect("default");
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__TEST_HUB_EP_VALID__", " 99 ") };
    let val: usize = env_parse("__TEST_HUB_EP_VALID__", 0).expect("parsed");
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__TEST_HUB_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_is_an_error() {
    unsafe { std::env::set_var("__TEST_HUB_EP_INVALID__", "notanumber") };
    let err = env_parse::<u16>("__TEST_HUB_EP_INVALID__", 7).expect_err("invalid");
    assert_eq!(
        err,
        ConfigError::Invalid { key: "__TEST_HUB_EP_INVALID__", value: "notanumber".into() }
    );
    assert_eq!(err.error_code(), "E_CONFIG_INVALID");
    unsafe { std::env::remove_var("__TEST_HUB_EP_INVALID__") };
}

// =============================================================================
// HubConfig
// =============================================================================

// The process environment is shared, so every HubConfig case runs in one test.
#[test]
fn hub_config_from_env() {
    unsafe {
        std::env::remove_var("PORT");
        std::env::remove_var("PROFILES_PATH");
        std::env::remove_var("CONNECTION_QUEUE_DEPTH");
    }
    let config = HubConfig::from_env().expect("defaults");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.profiles_path, PathBuf::from(DEFAULT_PROFILES_PATH));
    assert_eq!(config.queue_depth, DEFAULT_QUEUE_DEPTH);

    unsafe {
        std::env::set_var("PORT", "9443");
        std::env::set_var("PROFILES_PATH", "/etc/hub/profiles.yaml");
        std::env::set_var("CONNECTION_QUEUE_DEPTH", "16");
    }
    let config = HubConfig::from_env().expect("overrides");
    assert_eq!(config.port, 9443);
    assert_eq!(config.profiles_path, PathBuf::from("/etc/hub/profiles.yaml"));
    assert_eq!(config.queue_depth, 16);

    unsafe { std::env::set_var("CONNECTION_QUEUE_DEPTH", "0") };
    assert_eq!(
        HubConfig::from_env(),
        Err(ConfigError::TooSmall { key: "CONNECTION_QUEUE_DEPTH", min: 1 })
    );

    unsafe {
        std::env::set_var("CONNECTION_QUEUE_DEPTH", "16");
        std::env::set_var("PORT", "70000");
    }
    assert!(matches!(HubConfig::from_env(), Err(ConfigError::Invalid { key: "PORT", .. })));

    unsafe {
        std::env::remove_var("PORT");
        std::env::remove_var("PROFILES_PATH");
        std::env::remove_var("CONNECTION_QUEUE_DEPTH");
    }
}
