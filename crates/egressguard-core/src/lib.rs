// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for egressguard.
//!
//! This crate provides the CIDR matcher, the candidate-address and rejection
//! types, the error enums, the per-request [`ConnectionContext`], and the
//! traits that describe the contract between the policy layer and a
//! hook-capable transfer engine.

pub mod cidr;
pub mod context;
pub mod defaults;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use cidr::Cidr;
pub use context::{ConnectionContext, ConnectionState};
pub use defaults::{DEFAULT_IP_BLACKLIST, DEFAULT_LOCAL_PROBE_TARGET, DEFAULT_PORT_WHITELIST};
pub use error::{EgressError, Rejection, TransferError};
pub use traits::{ConnectHooks, TransferEngine};
pub use types::{
    AddressFamily, CandidateAddress, FailureMode, IpResolve, Scheme, SocketKind,
    TransferResponse, TransferResult, TransportProtocol, ValidationOutcome,
};
