// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./egressguard.toml` > `~/.config/egressguard/egressguard.toml`
//! > `/etc/egressguard/egressguard.toml` with environment variable overrides via
//! the `EGRESSGUARD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::EgressConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/egressguard/egressguard.toml";
pub(crate) const LOCAL_CONFIG: &str = "egressguard.toml";

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("egressguard/egressguard.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/egressguard/egressguard.toml`
/// 3. `~/.config/egressguard/egressguard.toml`
/// 4. `./egressguard.toml`
/// 5. `EGRESSGUARD_*` environment variables
pub fn load_config() -> Result<EgressConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<EgressConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EgressConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<EgressConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EgressConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(EgressConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider mapping `EGRESSGUARD_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys such as
/// `ip_whitelist` contain underscores themselves. Figment hands the key over
/// in its original case, so it is lowercased before the section is split off.
fn env_provider() -> Env {
    Env::prefixed("EGRESSGUARD_").map(|key| {
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("policy_", "policy.", 1)
            .replacen("transfer_", "transfer.", 1)
            .replacen("logging_", "logging.", 1);
        mapped.into()
    })
}
