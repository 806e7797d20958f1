// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as well-formed CIDR blocks, probe targets, and non-zero timeouts.

use std::net::SocketAddrV4;

use egressguard_core::Cidr;

use crate::diagnostic::ConfigError;
use crate::model::EgressConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &EgressConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let lists = [
        ("policy.ip_whitelist", &config.policy.ip_whitelist),
        ("policy.ip_blacklist", &config.policy.ip_blacklist),
    ];
    for (key, entries) in lists {
        for (i, entry) in entries.iter().enumerate() {
            if let Err(e) = entry.parse::<Cidr>() {
                errors.push(ConfigError::Validation {
                    message: format!("{key}[{i}] `{entry}`: {e}"),
                });
            }
        }
    }

    if config
        .policy
        .local_probe_target
        .parse::<SocketAddrV4>()
        .is_err()
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "policy.local_probe_target `{}` must be an IPv4 address with port",
                config.policy.local_probe_target
            ),
        });
    }

    if config.transfer.connect_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "transfer.connect_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.transfer.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "transfer.timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.transfer.user_agent.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "transfer.user_agent must not be empty".to_string(),
        });
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` must be one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
