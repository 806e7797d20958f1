// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted transfer engine for deterministic testing.
//!
//! `MockEngine` "resolves" to a fixed list of candidates and drives the
//! installed hooks exactly like a real engine would, but never connects.
//! It records which path each candidate took so tests can tell a real
//! socket from an aborted placeholder.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::TcpSocket;
use tracing::debug;

use egressguard_core::{
    AddressFamily, CandidateAddress, ConnectHooks, ConnectionContext, IpResolve, Scheme,
    TransferEngine, TransferError, TransferResponse, TransferResult,
};

/// What happened to one candidate during [`MockEngine::perform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPath {
    /// Check hook passed; the engine would have connected here.
    Connected(SocketAddr),
    /// Check hook asked the engine to abort.
    Aborted(SocketAddr),
    /// The socket-creation hook returned an I/O error.
    SocketFailed(SocketAddr),
    /// Skipped because the resolver was restricted to IPv4.
    Filtered(SocketAddr),
}

/// A transfer engine that walks a fixed candidate list.
pub struct MockEngine {
    scheme: Scheme,
    candidates: Vec<CandidateAddress>,
    hooks: Option<Arc<dyn ConnectHooks>>,
    allowed_schemes: Option<Vec<Scheme>>,
    ip_resolve: IpResolve,
    keep_trying: bool,
    status: u16,
    body: Bytes,
    paths: Vec<ConnectionPath>,
}

impl MockEngine {
    /// Create an engine whose host resolves to `addrs` (`ip:port` strings).
    ///
    /// # Panics
    ///
    /// Panics if an entry is not a socket address.
    pub fn new<I, S>(addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates = addrs
            .into_iter()
            .map(|s| {
                let addr: SocketAddr = s
                    .as_ref()
                    .parse()
                    .expect("mock candidate must be an ip:port socket address");
                CandidateAddress::tcp(addr)
            })
            .collect();
        Self::with_candidates(candidates)
    }

    /// Create an engine from fully specified candidates.
    pub fn with_candidates(candidates: Vec<CandidateAddress>) -> Self {
        Self {
            scheme: Scheme::Https,
            candidates,
            hooks: None,
            allowed_schemes: None,
            ip_resolve: IpResolve::Any,
            keep_trying: false,
            status: 200,
            body: Bytes::from_static(b"mock body"),
            paths: Vec::new(),
        }
    }

    /// Scheme of the simulated URL.
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Keep trying later candidates after an abort instead of failing.
    pub fn keep_trying_after_abort(mut self, keep_trying: bool) -> Self {
        self.keep_trying = keep_trying;
        self
    }

    /// Response returned when a candidate passes the check hook.
    pub fn respond_with(mut self, status: u16, body: impl Into<Bytes>) -> Self {
        self.status = status;
        self.body = body.into();
        self
    }

    pub fn has_hooks(&self) -> bool {
        self.hooks.is_some()
    }

    pub fn allowed_schemes(&self) -> Option<&[Scheme]> {
        self.allowed_schemes.as_deref()
    }

    pub fn ip_resolve(&self) -> IpResolve {
        self.ip_resolve
    }

    /// Paths taken by candidates across every `perform` call.
    pub fn paths(&self) -> &[ConnectionPath] {
        &self.paths
    }

    fn open(
        &self,
        ctx: &mut ConnectionContext,
        candidate: &CandidateAddress,
    ) -> std::io::Result<TcpSocket> {
        match &self.hooks {
            Some(hooks) => hooks.open_socket(ctx, candidate),
            None if candidate.family == AddressFamily::Inet6 => TcpSocket::new_v6(),
            None => TcpSocket::new_v4(),
        }
    }

    fn check(&self, ctx: &ConnectionContext, socket: &TcpSocket) -> bool {
        self.hooks
            .as_ref()
            .is_some_and(|hooks| hooks.check_socket(ctx, socket))
    }
}

#[async_trait]
impl TransferEngine for MockEngine {
    fn install_hooks(&mut self, hooks: Arc<dyn ConnectHooks>) {
        self.hooks = Some(hooks);
    }

    fn restrict_protocols(&mut self, schemes: &[Scheme]) {
        self.allowed_schemes = Some(schemes.to_vec());
    }

    fn set_ip_resolve(&mut self, resolve: IpResolve) {
        self.ip_resolve = resolve;
    }

    async fn perform(&mut self, ctx: &mut ConnectionContext) -> TransferResult {
        if let Some(allowed) = &self.allowed_schemes
            && !allowed.contains(&self.scheme)
        {
            return Err(TransferError::UnsupportedProtocol(self.scheme.to_string()));
        }

        let mut aborted = false;
        let mut last_socket_error = None;

        for candidate in self.candidates.clone() {
            let addr = candidate.socket_addr();

            if self.ip_resolve == IpResolve::V4Only && candidate.ip.is_ipv6() {
                self.paths.push(ConnectionPath::Filtered(addr));
                continue;
            }

            let socket = match self.open(ctx, &candidate) {
                Ok(socket) => socket,
                Err(e) => {
                    self.paths.push(ConnectionPath::SocketFailed(addr));
                    last_socket_error = Some(e);
                    continue;
                }
            };

            if self.check(ctx, &socket) {
                debug!(addr = %addr, "mock engine aborting candidate");
                self.paths.push(ConnectionPath::Aborted(addr));
                aborted = true;
                if self.keep_trying {
                    continue;
                }
                return Err(TransferError::AbortedByCallback);
            }

            self.paths.push(ConnectionPath::Connected(addr));
            return Ok(TransferResponse {
                status: self.status,
                headers: http::HeaderMap::new(),
                body: self.body.clone(),
                remote_addr: Some(addr),
            });
        }

        if aborted {
            return Err(TransferError::AbortedByCallback);
        }
        match last_socket_error {
            Some(e) => Err(TransferError::SocketCreation(e)),
            None => Err(TransferError::NoAddresses {
                host: "mock".to_string(),
            }),
        }
    }
}
