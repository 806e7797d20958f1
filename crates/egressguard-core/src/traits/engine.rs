// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection-establishment hooks and the transfer engine that drives them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpSocket;

use crate::context::ConnectionContext;
use crate::types::{CandidateAddress, IpResolve, Scheme, TransferResult};

/// Hooks a transfer engine calls while establishing a connection.
///
/// For every resolved candidate the engine calls [`open_socket`] exactly once
/// and then [`check_socket`] exactly once with the socket it got back, before
/// connecting it.
///
/// [`open_socket`]: ConnectHooks::open_socket
/// [`check_socket`]: ConnectHooks::check_socket
pub trait ConnectHooks: Send + Sync {
    /// Produce the socket to use for `candidate`.
    fn open_socket(
        &self,
        ctx: &mut ConnectionContext,
        candidate: &CandidateAddress,
    ) -> std::io::Result<TcpSocket>;

    /// Return `true` to abort the connection before any bytes are exchanged.
    fn check_socket(&self, ctx: &ConnectionContext, socket: &TcpSocket) -> bool;
}

/// A transfer engine with a hookable connection-establishment path.
#[async_trait]
pub trait TransferEngine: Send {
    /// Install hooks used for every subsequent connection.
    fn install_hooks(&mut self, hooks: Arc<dyn ConnectHooks>);

    /// Restrict the URL schemes the engine will accept.
    fn restrict_protocols(&mut self, schemes: &[Scheme]);

    /// Restrict the address families the resolver may return.
    fn set_ip_resolve(&mut self, resolve: IpResolve);

    /// Run the transfer. Hooks receive `ctx` by reference.
    async fn perform(&mut self, ctx: &mut ConnectionContext) -> TransferResult;
}
