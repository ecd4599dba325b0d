// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./waitline.toml` > `~/.config/waitline/waitline.toml`
//! > `/etc/waitline/waitline.toml` with environment variable overrides via
//! the `WAITLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WaitlineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/waitline/waitline.toml` (system-wide)
/// 3. `~/.config/waitline/waitline.toml` (user XDG config)
/// 4. `./waitline.toml` (local directory)
/// 5. `WAITLINE_*` environment variables
pub fn load_config() -> Result<WaitlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<WaitlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaitlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WaitlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaitlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use, before extraction).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WaitlineConfig::default()))
        .merge(Toml::file("/etc/waitline/waitline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("waitline/waitline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("waitline.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WAITLINE_STORAGE_DATABASE_PATH` must
/// map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("WAITLINE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: WAITLINE_CLAIMS_TOKEN_SECRET -> "claims_token_secret"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("waitlist_", "waitlist.", 1)
            .replacen("claims_", "claims.", 1)
            .replacen("sms_", "sms.", 1)
            .replacen("email_", "email.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_loader_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[waitlist]
default_claim_expiry_minutes = 25

[claims]
token_secret = "a-test-secret-of-length"
"#,
        )
        .unwrap();
        assert_eq!(config.waitlist.default_claim_expiry_minutes, 25);
        assert_eq!(
            config.claims.token_secret.as_deref(),
            Some("a-test-secret-of-length")
        );
        // Untouched sections keep defaults.
        assert_eq!(config.service.name, "waitline");
    }

    // Env overrides are tested via dot-notation merges to keep tests free of
    // process-global env mutation; env_provider() maps WAITLINE_* names onto
    // exactly these dotted keys.
    #[test]
    fn dotted_override_targets_section_not_nested_keys() {
        let config: WaitlineConfig = Figment::new()
            .merge(Serialized::defaults(WaitlineConfig::default()))
            .merge(("storage.database_path", "/tmp/waitline-test.db"))
            .merge(("waitlist.max_declines", 5))
            .extract()
            .expect("should merge dotted overrides");
        assert_eq!(config.storage.database_path, "/tmp/waitline-test.db");
        assert_eq!(config.waitlist.max_declines, 5);
    }
}
