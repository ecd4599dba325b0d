// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as channel credential completeness and sane durations.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::WaitlineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WaitlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let addr = config.service.bind_address.trim();
    if addr.is_empty() {
        errors.push(ConfigError::Validation {
            message: "service.bind_address must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!(
                    "service.bind_address `{addr}` is not a valid IP address or hostname"
                ),
            });
        }
    }

    let wl = &config.waitlist;
    if wl.default_claim_expiry_minutes < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "waitlist.default_claim_expiry_minutes must be at least 1, got {}",
                wl.default_claim_expiry_minutes
            ),
        });
    }
    if wl.decline_cooldown_minutes < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "waitlist.decline_cooldown_minutes must be non-negative, got {}",
                wl.decline_cooldown_minutes
            ),
        });
    }
    if wl.max_declines < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "waitlist.max_declines must be at least 1, got {}",
                wl.max_declines
            ),
        });
    }
    if wl.sweep_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "waitlist.sweep_interval_secs must be at least 1".to_string(),
        });
    }
    if wl.sweep_batch_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "waitlist.sweep_batch_limit must be at least 1".to_string(),
        });
    }

    if let Some(secret) = &config.claims.token_secret
        && secret.len() < 16
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "claims.token_secret must be at least 16 bytes, got {}",
                secret.len()
            ),
        });
    }
    if config.claims.public_base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "claims.public_base_url must not be empty".to_string(),
        });
    }

    // A channel may be disabled with partial credentials, but enabling one
    // requires the full set.
    if config.sms.enabled {
        for (field, value) in [
            ("sms.account_sid", &config.sms.account_sid),
            ("sms.auth_token", &config.sms.auth_token),
            ("sms.from_number", &config.sms.from_number),
        ] {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                errors.push(ConfigError::Validation {
                    message: format!("{field} is required when sms.enabled = true"),
                });
            }
        }
    }
    if config.email.enabled {
        for (field, value) in [
            ("email.smtp_host", &config.email.smtp_host),
            ("email.from_address", &config.email.from_address),
        ] {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                errors.push(ConfigError::Validation {
                    message: format!("{field} is required when email.enabled = true"),
                });
            }
        }
    }

    // Policy rules must not shadow each other.
    let mut seen_rules = HashSet::new();
    for rule in &config.policies {
        if !seen_rules.insert((&rule.salon_id, &rule.service_id)) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate [[policies]] rule for salon `{}` service `{}`",
                    rule.salon_id, rule.service_id
                ),
            });
        }
        if rule.claim_expiry_minutes < 1 {
            errors.push(ConfigError::Validation {
                message: format!(
                    "policies rule for salon `{}` service `{}` must have claim_expiry_minutes >= 1",
                    rule.salon_id, rule.service_id
                ),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
