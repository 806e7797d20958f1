// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSRF prevention for outbound HTTP(S) connections.
//!
//! The [`Policy`] decides whether a concrete resolved address may be dialed.
//! The [`Interceptor`] plugs that decision into a transfer engine's
//! socket-creation and pre-connect hooks, and [`SsrfGuard`] runs a transfer
//! through it and turns a recorded rejection into the configured failure.
//! [`build_guarded_client`] applies the same policy to a `reqwest` client
//! through a URL check on every request and redirect plus its DNS resolver.

pub mod guard;
pub mod interceptor;
pub mod local_addr;
pub mod policy;
pub mod resolver;

pub use guard::SsrfGuard;
pub use interceptor::Interceptor;
pub use local_addr::{LocalAddressDetector, RoutingProbe, StaticLocalAddress};
pub use policy::{Policy, PolicyBuilder};
pub use resolver::{build_guarded_client, validate_url, GuardedClient, PolicyResolver};
