use feishu_notifier::{
    config::DEFAULT_BASE_URL, BotSetup, DisabledMode, FeishuConfig, FeishuError, Notifier,
    Recipient,
};
use serial_test::serial;
use std::collections::HashMap;
use std::time::Duration;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn setup(pairs: &[(&str, &str)]) -> BotSetup {
    let vars = vars(pairs);
    BotSetup::from_vars(|key| vars.get(key).cloned())
}

#[test]
fn test_full_configuration_is_enabled() {
    let setup = setup(&[
        ("FEISHU_APP_ID", "cli_a"),
        ("FEISHU_APP_SECRET", "secret"),
        ("FEISHU_EMAIL", "u@x.com"),
    ]);

    match setup {
        BotSetup::Enabled(config) => {
            assert_eq!(config.credentials.app_id, "cli_a");
            assert_eq!(config.credentials.app_secret, "secret");
            assert_eq!(config.recipient, Recipient::Email("u@x.com".to_string()));
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
            assert!(config.timeout.is_none());
        }
        other => panic!("expected enabled setup, got {other:?}"),
    }
}

#[test]
fn test_recipient_precedence_phone_email_open_id() {
    let all = setup(&[
        ("FEISHU_APP_ID", "a"),
        ("FEISHU_APP_SECRET", "b"),
        ("FEISHU_PHONE", "+8613800000000"),
        ("FEISHU_EMAIL", "u@x.com"),
        ("FEISHU_OPEN_ID", "ou_123"),
    ]);
    let BotSetup::Enabled(config) = all else {
        panic!("expected enabled setup");
    };
    assert_eq!(config.recipient, Recipient::Phone("+8613800000000".to_string()));

    let no_phone = setup(&[
        ("FEISHU_APP_ID", "a"),
        ("FEISHU_APP_SECRET", "b"),
        ("FEISHU_EMAIL", "u@x.com"),
        ("FEISHU_OPEN_ID", "ou_123"),
    ]);
    let BotSetup::Enabled(config) = no_phone else {
        panic!("expected enabled setup");
    };
    assert_eq!(config.recipient, Recipient::Email("u@x.com".to_string()));

    let open_id_only = setup(&[
        ("FEISHU_APP_ID", "a"),
        ("FEISHU_APP_SECRET", "b"),
        ("FEISHU_OPEN_ID", "ou_123"),
    ]);
    let BotSetup::Enabled(config) = open_id_only else {
        panic!("expected enabled setup");
    };
    assert_eq!(config.recipient, Recipient::OpenId("ou_123".to_string()));
}

#[test]
fn test_missing_credentials_disable_the_bot() {
    let setup = setup(&[("FEISHU_APP_SECRET", "b"), ("FEISHU_EMAIL", "u@x.com")]);
    match setup {
        BotSetup::Disabled { reason, mode } => {
            assert!(reason.contains("FEISHU_APP_ID"));
            assert_eq!(mode, DisabledMode::Noop);
        }
        other => panic!("expected disabled setup, got {other:?}"),
    }
}

#[test]
fn test_blank_values_count_as_unset() {
    let setup = setup(&[
        ("FEISHU_APP_ID", "a"),
        ("FEISHU_APP_SECRET", "b"),
        ("FEISHU_PHONE", "   "),
        ("FEISHU_EMAIL", ""),
    ]);
    match setup {
        BotSetup::Disabled { reason, .. } => assert!(reason.contains("FEISHU_OPEN_ID")),
        other => panic!("expected disabled setup, got {other:?}"),
    }
}

#[test]
fn test_invalid_timeout_disables_the_bot() {
    let setup = setup(&[
        ("FEISHU_APP_ID", "a"),
        ("FEISHU_APP_SECRET", "b"),
        ("FEISHU_OPEN_ID", "ou_1"),
        ("FEISHU_TIMEOUT_SECS", "soon"),
    ]);
    assert!(!setup.is_enabled());
}

#[test]
fn test_optional_settings() {
    let vars = vars(&[
        ("FEISHU_APP_ID", "a"),
        ("FEISHU_APP_SECRET", "b"),
        ("FEISHU_OPEN_ID", "ou_1"),
        ("FEISHU_BASE_URL", "http://127.0.0.1:9000/"),
        ("FEISHU_TIMEOUT_SECS", "15"),
    ]);
    let config = FeishuConfig::from_vars(|key| vars.get(key).cloned()).unwrap();
    assert_eq!(config.base_url, "http://127.0.0.1:9000");
    assert_eq!(config.timeout, Some(Duration::from_secs(15)));
}

#[test]
fn test_disabled_mode_parsing() {
    match setup(&[("FEISHU_DISABLED_MODE", "ERROR")]) {
        BotSetup::Disabled { mode, .. } => assert_eq!(mode, DisabledMode::Error),
        other => panic!("expected disabled setup, got {other:?}"),
    }

    // an unknown value is a configuration error even with full credentials
    match setup(&[
        ("FEISHU_APP_ID", "a"),
        ("FEISHU_APP_SECRET", "b"),
        ("FEISHU_OPEN_ID", "ou_1"),
        ("FEISHU_DISABLED_MODE", "explode"),
    ]) {
        BotSetup::Disabled { reason, mode } => {
            assert!(reason.contains("FEISHU_DISABLED_MODE"));
            assert_eq!(mode, DisabledMode::Noop);
        }
        other => panic!("expected disabled setup, got {other:?}"),
    }
}

#[test]
fn test_invalid_disabled_mode_is_config_error() {
    let vars = vars(&[
        ("FEISHU_APP_ID", "a"),
        ("FEISHU_APP_SECRET", "b"),
        ("FEISHU_OPEN_ID", "ou_1"),
        ("FEISHU_DISABLED_MODE", "explode"),
    ]);
    let err = FeishuConfig::from_vars(|key| vars.get(key).cloned()).unwrap_err();
    assert!(matches!(err, FeishuError::Config(_)));
}

#[test]
fn test_enabled_config_carries_disabled_mode() {
    match setup(&[
        ("FEISHU_APP_ID", "a"),
        ("FEISHU_APP_SECRET", "b"),
        ("FEISHU_OPEN_ID", "ou_1"),
        ("FEISHU_DISABLED_MODE", "error"),
    ]) {
        BotSetup::Enabled(config) => assert_eq!(config.disabled_mode, DisabledMode::Error),
        other => panic!("expected enabled setup, got {other:?}"),
    }

    let config = FeishuConfig::new("a", "b", Recipient::OpenId("ou_1".into()));
    assert_eq!(config.disabled_mode, DisabledMode::Noop);
    let config = config.with_disabled_mode(DisabledMode::Error);
    assert_eq!(config.disabled_mode, DisabledMode::Error);
}

#[test]
fn test_credentials_debug_hides_secret() {
    let config = FeishuConfig::new("cli_a", "top-secret", Recipient::OpenId("ou_1".into()));
    let printed = format!("{:?}", config);
    assert!(printed.contains("cli_a"));
    assert!(!printed.contains("top-secret"));
}

#[tokio::test]
async fn test_disabled_noop_returns_none() {
    let notifier = Notifier::from_setup(setup(&[]));
    assert!(!notifier.is_enabled());
    assert!(notifier.bot().is_none());

    assert_eq!(notifier.send_text("hello").await.unwrap(), None);
    assert_eq!(notifier.send_card("**x**", "title").await.unwrap(), None);
    assert_eq!(notifier.send_image(vec![1u8, 2, 3]).await.unwrap(), None);
}

#[tokio::test]
async fn test_disabled_error_mode_reports_reason() {
    let notifier = Notifier::from_setup(setup(&[("FEISHU_DISABLED_MODE", "error")]));

    let err = notifier.send_text("hello").await.unwrap_err();
    match err {
        FeishuError::Disabled(reason) => assert!(reason.contains("FEISHU_APP_ID")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
#[serial]
fn test_from_env_reads_process_environment() {
    let keys = [
        "FEISHU_APP_ID",
        "FEISHU_APP_SECRET",
        "FEISHU_PHONE",
        "FEISHU_EMAIL",
        "FEISHU_OPEN_ID",
        "FEISHU_BASE_URL",
        "FEISHU_TIMEOUT_SECS",
        "FEISHU_DISABLED_MODE",
    ];
    let saved: Vec<_> = keys.iter().map(|k| (*k, std::env::var(k).ok())).collect();

    std::env::set_var("FEISHU_APP_ID", "env_app");
    std::env::set_var("FEISHU_APP_SECRET", "env_secret");
    std::env::remove_var("FEISHU_PHONE");
    std::env::set_var("FEISHU_EMAIL", "env@x.com");
    std::env::remove_var("FEISHU_OPEN_ID");
    std::env::remove_var("FEISHU_BASE_URL");
    std::env::remove_var("FEISHU_TIMEOUT_SECS");
    std::env::remove_var("FEISHU_DISABLED_MODE");

    let setup = BotSetup::from_env();

    for (key, value) in saved {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }

    match setup {
        BotSetup::Enabled(config) => {
            assert_eq!(config.credentials.app_id, "env_app");
            assert_eq!(config.recipient, Recipient::Email("env@x.com".to_string()));
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
            assert!(config.timeout.is_none());
            assert_eq!(config.disabled_mode, DisabledMode::Noop);
        }
        other => panic!("expected enabled setup, got {other:?}"),
    }
}
