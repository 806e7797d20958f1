// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the policy, the interceptor, and transfer engines.

use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Rejection, TransferError};

/// Address family of a resolved candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AddressFamily {
    Inet,
    Inet6,
    Unix,
}

/// Socket type requested for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SocketKind {
    Stream,
    Datagram,
    Raw,
}

/// Transport protocol requested for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TransportProtocol {
    Tcp,
    Udp,
}

/// One resolved address the transfer engine wants to open a socket for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateAddress {
    pub family: AddressFamily,
    pub socket_kind: SocketKind,
    pub protocol: TransportProtocol,
    pub ip: IpAddr,
    pub port: u16,
}

impl CandidateAddress {
    /// A TCP stream candidate, family derived from the address.
    pub fn tcp(addr: SocketAddr) -> Self {
        let family = match addr {
            SocketAddr::V4(_) => AddressFamily::Inet,
            SocketAddr::V6(_) => AddressFamily::Inet6,
        };
        Self {
            family,
            socket_kind: SocketKind::Stream,
            protocol: TransportProtocol::Tcp,
            ip: addr.ip(),
            port: addr.port(),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// Result of validating a candidate against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accept,
    Reject(Rejection),
}

impl ValidationOutcome {
    pub fn is_accept(&self) -> bool {
        matches!(self, ValidationOutcome::Accept)
    }
}

/// How a recorded rejection is surfaced to the caller of a guarded transfer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FailureMode {
    /// Return the transfer's own result; callers inspect the context.
    #[default]
    Silent,
    /// Return a policy-violation error carrying the reason.
    Raise,
}

/// URL schemes a transfer engine may be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// Address families the engine's resolver may return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IpResolve {
    #[default]
    Any,
    V4Only,
}

/// A completed HTTP transfer.
#[derive(Debug, Clone)]
pub struct TransferResponse {
    pub status: u16,
    pub headers: http::HeaderMap,
    pub body: Bytes,
    /// The address the body was actually fetched from.
    pub remote_addr: Option<SocketAddr>,
}

/// The raw outcome of running a transfer engine.
pub type TransferResult = Result<TransferResponse, TransferError>;
