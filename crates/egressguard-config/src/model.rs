// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for egressguard.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use egressguard_core::{
    FailureMode, DEFAULT_IP_BLACKLIST, DEFAULT_LOCAL_PROBE_TARGET, DEFAULT_PORT_WHITELIST,
};
use serde::{Deserialize, Serialize};

/// Top-level egressguard configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EgressConfig {
    /// Address policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Transfer engine settings.
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Address policy configuration.
///
/// Lists are taken as ordered sequences and de-duplicated when the policy
/// is built. An empty `port_whitelist` allows every port not blacklisted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// CIDR blocks that are always allowed, even if blacklisted.
    #[serde(default)]
    pub ip_whitelist: Vec<String>,

    /// CIDR blocks that are refused.
    #[serde(default = "default_ip_blacklist")]
    pub ip_blacklist: Vec<String>,

    /// Ports that may be dialed. Empty allows all.
    #[serde(default = "default_port_whitelist")]
    pub port_whitelist: Vec<u16>,

    /// Ports that are refused even when whitelisted.
    #[serde(default)]
    pub port_blacklist: Vec<u16>,

    /// Refuse the host's own outward-facing address.
    #[serde(default)]
    pub detect_local_addresses: bool,

    /// `silent` returns the transfer result; `raise` returns a policy error.
    #[serde(default)]
    pub failure_mode: FailureMode,

    /// `IPv4:port` used to discover the outward-facing local address.
    #[serde(default = "default_local_probe_target")]
    pub local_probe_target: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ip_whitelist: Vec::new(),
            ip_blacklist: default_ip_blacklist(),
            port_whitelist: default_port_whitelist(),
            port_blacklist: Vec::new(),
            detect_local_addresses: false,
            failure_mode: FailureMode::default(),
            local_probe_target: default_local_probe_target(),
        }
    }
}

fn default_ip_blacklist() -> Vec<String> {
    DEFAULT_IP_BLACKLIST.iter().map(|s| s.to_string()).collect()
}

fn default_port_whitelist() -> Vec<u16> {
    DEFAULT_PORT_WHITELIST.to_vec()
}

fn default_local_probe_target() -> String {
    DEFAULT_LOCAL_PROBE_TARGET.to_string()
}

/// Transfer engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    /// Per-candidate connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-transfer timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("egressguard/{}", env!("CARGO_PKG_VERSION"))
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_policy_tables() {
        let config = EgressConfig::default();
        assert_eq!(config.policy.ip_blacklist.len(), 15);
        assert_eq!(config.policy.port_whitelist, vec![80, 443, 8080, 8443]);
        assert!(config.policy.ip_whitelist.is_empty());
        assert!(config.policy.port_blacklist.is_empty());
        assert!(!config.policy.detect_local_addresses);
        assert_eq!(config.policy.failure_mode, FailureMode::Silent);
        assert_eq!(config.transfer.timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn user_agent_carries_version() {
        let config = TransferConfig::default();
        assert!(config.user_agent.starts_with("egressguard/"));
    }
}
