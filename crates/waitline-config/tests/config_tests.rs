// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Waitline configuration system.

use waitline_config::{ConfigError, WaitlineConfig, load_and_validate_str};

#[test]
fn minimal_toml_fills_defaults() {
    let config = load_and_validate_str(
        r#"
[service]
name = "waitline-test"
"#,
    )
    .expect("minimal config should validate");

    assert_eq!(config.service.name, "waitline-test");
    assert_eq!(config.service.log_level, "info");
    assert!(config.storage.wal_mode);
    assert_eq!(config.waitlist.default_claim_expiry_minutes, 15);
    assert_eq!(config.waitlist.decline_cooldown_minutes, 30);
    assert_eq!(config.claims.sms_timeout_secs, 10);
    assert!(config.claims.token_secret.is_none());
}

#[test]
fn full_production_shaped_config_validates() {
    let config = load_and_validate_str(
        r#"
[service]
name = "waitline"
log_level = "debug"
bind_address = "0.0.0.0"
port = 8700

[storage]
database_path = "/var/lib/waitline/waitline.db"

[waitlist]
default_claim_expiry_minutes = 20
decline_cooldown_minutes = 45
max_declines = 2
sweep_interval_secs = 30
requeue_lapsed = true

[claims]
token_secret = "0123456789abcdef0123"
public_base_url = "https://book.example.com"

[sms]
enabled = true
account_sid = "ACxxxxxxxx"
auth_token = "secret-token"
from_number = "+15551230000"

[email]
enabled = true
smtp_host = "smtp.example.com"
from_address = "no-reply@example.com"

[[policies]]
salon_id = "0d2a7e6a-57a5-4f3e-9f07-0e1e60761001"
service_id = "0d2a7e6a-57a5-4f3e-9f07-0e1e60761002"
claim_expiry_minutes = 10
"#,
    )
    .expect("full config should validate");

    assert_eq!(config.waitlist.max_declines, 2);
    assert!(config.waitlist.requeue_lapsed);
    assert!(config.sms.enabled);
    assert_eq!(config.policies.len(), 1);
    assert_eq!(config.policies[0].claim_expiry_minutes, 10);
}

#[test]
fn unknown_section_key_reports_diagnostic() {
    let errors = load_and_validate_str(
        r#"
[claims]
token_secert = "0123456789abcdef"
"#,
    )
    .unwrap_err();

    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, .. } if key == "token_secert"
    )));
}

#[test]
fn validation_errors_are_collected_not_fail_fast() {
    let errors = load_and_validate_str(
        r#"
[storage]
database_path = ""

[waitlist]
max_declines = 0
"#,
    )
    .unwrap_err();

    // One error per violated constraint.
    assert!(errors.len() >= 2, "expected both errors, got {errors:?}");
}

#[test]
fn dotted_env_style_override_wins_over_defaults() {
    use figment::{Figment, providers::Serialized};

    let config: WaitlineConfig = Figment::new()
        .merge(Serialized::defaults(WaitlineConfig::default()))
        .merge(("claims.public_base_url", "https://env.example.com"))
        .extract()
        .expect("dotted merge should extract");

    assert_eq!(config.claims.public_base_url, "https://env.example.com");
}
