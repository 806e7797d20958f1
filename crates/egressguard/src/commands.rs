// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.

use std::io::Write;
use std::net::IpAddr;
use std::time::Duration;

use egressguard_config::EgressConfig;
use egressguard_core::{ConnectionContext, EgressError, FailureMode, Rejection};
use egressguard_http::HttpTransfer;
use egressguard_security::{validate_url, Policy, SsrfGuard};
use http::Method;
use thiserror::Error;
use tracing::{debug, info};

/// Exit code for a rejected target or failed request.
pub const EXIT_FAILED: u8 = 1;
/// Exit code for configuration errors.
pub const EXIT_CONFIG: u8 = 2;

/// Why a subcommand did not succeed.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The configuration could not be turned into a policy.
    #[error("{0}")]
    Config(String),
    /// The target was rejected or the request failed.
    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandError::Config(_) => EXIT_CONFIG,
            CommandError::Failed(_) => EXIT_FAILED,
        }
    }
}

impl From<EgressError> for CommandError {
    fn from(err: EgressError) -> Self {
        match err {
            EgressError::InvalidPolicyInput(_) | EgressError::Config(_) => {
                CommandError::Config(err.to_string())
            }
            other => CommandError::Failed(other.to_string()),
        }
    }
}

fn policy(config: &EgressConfig) -> Result<Policy, CommandError> {
    Ok(Policy::from_config(&config.policy)?)
}

pub fn check_ip(config: &EgressConfig, ip: &str) -> Result<(), CommandError> {
    let ip: IpAddr = ip
        .parse()
        .map_err(|_| CommandError::Failed(format!("`{ip}` is not an IP address")))?;
    let policy = policy(config)?;

    let allowed = match ip {
        IpAddr::V4(v4) => policy.validate_ip(v4),
        IpAddr::V6(_) => false,
    };
    if allowed {
        println!("allowed: {ip}");
        Ok(())
    } else {
        Err(CommandError::Failed(
            Rejection::IpNotAllowed(ip).to_string(),
        ))
    }
}

pub fn check_port(config: &EgressConfig, port: u16) -> Result<(), CommandError> {
    if policy(config)?.validate_port(port) {
        println!("allowed: port {port}");
        Ok(())
    } else {
        Err(CommandError::Failed(
            Rejection::PortNotAllowed(port).to_string(),
        ))
    }
}

pub fn check_url(config: &EgressConfig, url: &str) -> Result<(), CommandError> {
    validate_url(&policy(config)?, url)?;
    println!("allowed: {url}");
    Ok(())
}

pub async fn fetch(
    config: &EgressConfig,
    url: &str,
    method: &str,
    raise: bool,
) -> Result<(), CommandError> {
    let mut policy_config = config.policy.clone();
    if raise {
        policy_config.failure_mode = FailureMode::Raise;
    }
    let guard = SsrfGuard::new(Policy::from_config(&policy_config)?);

    let method: Method = method
        .parse()
        .map_err(|_| CommandError::Failed(format!("`{method}` is not an HTTP method")))?;
    let mut engine = HttpTransfer::new(url)
        .map_err(|e| CommandError::Failed(e.to_string()))?
        .method(method)
        .user_agent(config.transfer.user_agent.clone())
        .connect_timeout(Duration::from_secs(config.transfer.connect_timeout_secs))
        .timeout(Duration::from_secs(config.transfer.timeout_secs));

    let mut ctx = ConnectionContext::new();
    let result = guard.execute(&mut engine, &mut ctx).await;

    if let Some(reason) = ctx.rejection_reason() {
        info!(url = %url, reason = %reason, "request blocked");
    }

    let response = result.map_err(|e| match ctx.rejection_reason() {
        Some(reason) if !matches!(e, EgressError::PolicyViolation { .. }) => {
            CommandError::Failed(format!("{e} ({reason})"))
        }
        _ => CommandError::from(e),
    })?;

    debug!(status = response.status, bytes = response.body.len(), "request completed");
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&response.body)
        .and_then(|()| stdout.flush())
        .map_err(|e| CommandError::Failed(format!("failed to write response: {e}")))?;

    if response.status >= 400 {
        return Err(CommandError::Failed(format!("HTTP status {}", response.status)));
    }
    Ok(())
}
