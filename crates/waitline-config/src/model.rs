// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Waitline service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Waitline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaitlineConfig {
    /// Service identity, logging, and HTTP bind settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Matching, claim, and sweep behavior.
    #[serde(default)]
    pub waitlist: WaitlistConfig,

    /// Claim-token issuance settings.
    #[serde(default)]
    pub claims: ClaimsConfig,

    /// SMS channel settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Email channel settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// Per-service claim-expiry policy overrides.
    #[serde(default)]
    pub policies: Vec<PolicyRuleConfig>,
}

/// Service identity and HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Address the HTTP surface binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port the HTTP surface binds to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_service_name() -> String {
    "waitline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8620
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("waitline").join("waitline.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "waitline.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Matching, claim, and sweep behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaitlistConfig {
    /// Claim window when no per-service policy resolves, in minutes.
    #[serde(default = "default_claim_expiry_minutes")]
    pub default_claim_expiry_minutes: i64,

    /// Cooldown applied to an entry after it declines an offer, in minutes.
    #[serde(default = "default_decline_cooldown_minutes")]
    pub decline_cooldown_minutes: i64,

    /// Declines after which an entry is expired instead of requeued.
    #[serde(default = "default_max_declines")]
    pub max_declines: i64,

    /// How often the expiry sweep runs, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Maximum entries reclaimed per sweep pass.
    #[serde(default = "default_sweep_batch_limit")]
    pub sweep_batch_limit: u32,

    /// How long a `notified` entry may sit without an offer row before the
    /// sweep treats it as a crash orphan and reverts it, in minutes.
    #[serde(default = "default_orphan_grace_minutes")]
    pub orphan_grace_minutes: i64,

    /// When true, lapsed claims return the entry to `waiting` with a
    /// cooldown instead of expiring it.
    #[serde(default)]
    pub requeue_lapsed: bool,

    /// Cooldown applied when `requeue_lapsed` returns an entry, in minutes.
    #[serde(default = "default_lapse_cooldown_minutes")]
    pub lapse_cooldown_minutes: i64,

    /// Intake requests allowed per customer per hour.
    #[serde(default = "default_intake_rate_limit")]
    pub intake_rate_limit_per_hour: u32,
}

impl Default for WaitlistConfig {
    fn default() -> Self {
        Self {
            default_claim_expiry_minutes: default_claim_expiry_minutes(),
            decline_cooldown_minutes: default_decline_cooldown_minutes(),
            max_declines: default_max_declines(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_batch_limit: default_sweep_batch_limit(),
            orphan_grace_minutes: default_orphan_grace_minutes(),
            requeue_lapsed: false,
            lapse_cooldown_minutes: default_lapse_cooldown_minutes(),
            intake_rate_limit_per_hour: default_intake_rate_limit(),
        }
    }
}

fn default_claim_expiry_minutes() -> i64 {
    15
}

fn default_decline_cooldown_minutes() -> i64 {
    30
}

fn default_max_declines() -> i64 {
    3
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_sweep_batch_limit() -> u32 {
    100
}

fn default_orphan_grace_minutes() -> i64 {
    10
}

fn default_lapse_cooldown_minutes() -> i64 {
    60
}

fn default_intake_rate_limit() -> u32 {
    5
}

/// Claim-token issuance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimsConfig {
    /// Secret key for the keyed token hash. Required to serve; tokens
    /// become unverifiable if it changes.
    #[serde(default)]
    pub token_secret: Option<String>,

    /// Base URL embedded in accept/decline links sent to customers.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Per-send timeout for the SMS channel, in seconds.
    #[serde(default = "default_sms_timeout_secs")]
    pub sms_timeout_secs: u64,

    /// Per-send timeout for the email channel, in seconds.
    #[serde(default = "default_email_timeout_secs")]
    pub email_timeout_secs: u64,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            public_base_url: default_public_base_url(),
            sms_timeout_secs: default_sms_timeout_secs(),
            email_timeout_secs: default_email_timeout_secs(),
        }
    }
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8620".to_string()
}

fn default_sms_timeout_secs() -> u64 {
    10
}

fn default_email_timeout_secs() -> u64 {
    15
}

/// SMS channel configuration (Twilio-compatible API).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// `false` disables the SMS channel entirely.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// E.164 sender number.
    #[serde(default)]
    pub from_number: Option<String>,

    /// API base URL. Overridable for testing against a local mock.
    #[serde(default = "default_sms_api_base_url")]
    pub api_base_url: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base_url: default_sms_api_base_url(),
        }
    }
}

fn default_sms_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}

/// Email channel configuration (SMTP submission).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// `false` disables the email channel entirely.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Sender address for offer emails.
    #[serde(default)]
    pub from_address: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

/// One claim-expiry policy override, matched on (salon, service).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRuleConfig {
    pub salon_id: String,
    pub service_id: String,
    pub claim_expiry_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_waitlist_values() {
        let config = WaitlineConfig::default();
        assert_eq!(config.waitlist.default_claim_expiry_minutes, 15);
        assert_eq!(config.waitlist.max_declines, 3);
        assert!(!config.waitlist.requeue_lapsed);
        assert!(!config.sms.enabled);
        assert!(!config.email.enabled);
        assert!(config.policies.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[waitlist]
default_claim_expiry_minutes = 20
claim_exipry = 10
"#;
        assert!(toml::from_str::<WaitlineConfig>(toml_str).is_err());
    }

    #[test]
    fn policy_rules_deserialize_from_array_of_tables() {
        let toml_str = r#"
[[policies]]
salon_id = "6f1e1d3c-0000-0000-0000-000000000001"
service_id = "6f1e1d3c-0000-0000-0000-000000000002"
claim_expiry_minutes = 30
"#;
        let config: WaitlineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.policies.len(), 1);
        assert_eq!(config.policies[0].claim_expiry_minutes, 30);
    }
}
