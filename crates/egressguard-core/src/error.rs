// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for egressguard.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::types::{AddressFamily, SocketKind, TransportProtocol};

/// Why a candidate address was refused by the policy.
///
/// The `Display` text is the human-readable reason recorded on the
/// connection context and carried by [`EgressError::PolicyViolation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Invalid address family {0}")]
    InvalidAddressFamily(AddressFamily),

    #[error("Invalid socket type {0}")]
    InvalidSocketType(SocketKind),

    #[error("Invalid transport protocol {0}")]
    InvalidTransportProtocol(TransportProtocol),

    #[error("Invalid port {0}")]
    PortNotAllowed(u16),

    #[error("Invalid IP {0}")]
    IpNotAllowed(IpAddr),
}

/// Failures reported by a transfer engine.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The URL could not be parsed or has no host.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL scheme is not in the engine's allowed protocol set.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// Name resolution failed.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },

    /// Resolution succeeded but left no usable address.
    #[error("no usable address for {host}")]
    NoAddresses { host: String },

    /// The pre-connect check hook asked the engine to abort.
    #[error("connection aborted by pre-connect check")]
    AbortedByCallback,

    /// The socket-creation hook could not produce a socket.
    #[error("socket creation failed: {0}")]
    SocketCreation(std::io::Error),

    /// Connecting to a candidate failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// TLS setup or handshake failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// HTTP protocol failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The transfer exceeded its deadline.
    #[error("transfer timed out after {0:?}")]
    Timeout(Duration),
}

/// The primary error type returned by policy construction and guarded transfers.
#[derive(Debug, Error)]
pub enum EgressError {
    /// Whitelist/blacklist input could not be turned into a policy.
    #[error("invalid policy input: {0}")]
    InvalidPolicyInput(String),

    /// A connection attempt was rejected by the address policy.
    #[error("policy violation: {reason}")]
    PolicyViolation { reason: String },

    /// The underlying transfer failed for reasons other than policy.
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// Configuration errors surfaced outside the config diagnostics path.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
