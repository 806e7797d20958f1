// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection interception: validates every candidate at the moment the
//! transfer engine asks for a socket.
//!
//! The protocol is split across two hooks. `open_socket` validates and
//! always hands back a usable socket: a real one on accept, a placeholder
//! plus a recorded rejection on reject. `check_socket` then reports the
//! rejection and the engine aborts before connecting.
//!
//! The socket-creation hook must never fail on a policy rejection. Some
//! transfer engines hang instead of failing cleanly when that hook returns
//! an error or an invalid descriptor, so the abort is always deferred to the
//! check hook. The placeholder is never connected and is dropped with the
//! rest of the engine's sockets.

use std::sync::Arc;

use egressguard_core::{
    CandidateAddress, ConnectHooks, ConnectionContext, ConnectionState, ValidationOutcome,
};
use tokio::net::TcpSocket;
use tracing::{debug, warn};

use crate::policy::Policy;

/// [`ConnectHooks`] implementation backed by a [`Policy`].
#[derive(Debug, Clone)]
pub struct Interceptor {
    policy: Arc<Policy>,
}

impl Interceptor {
    pub fn new(policy: Arc<Policy>) -> Self {
        Self { policy }
    }

    /// A socket that satisfies the engine but is never used for I/O.
    fn placeholder() -> std::io::Result<TcpSocket> {
        TcpSocket::new_v4()
    }
}

impl ConnectHooks for Interceptor {
    fn open_socket(
        &self,
        ctx: &mut ConnectionContext,
        candidate: &CandidateAddress,
    ) -> std::io::Result<TcpSocket> {
        let outcome = self.policy.validate_candidate(candidate);

        // A handle that already holds a rejection stays refused.
        if ctx.state() == ConnectionState::Rejected {
            warn!(
                ip = %candidate.ip,
                port = candidate.port,
                "socket requested on a handle that already recorded a rejection"
            );
            match outcome {
                ValidationOutcome::Reject(rejection) => ctx.record_rejection(rejection),
                ValidationOutcome::Accept => ctx.mark_refused(),
            }
            return Self::placeholder();
        }

        match outcome {
            ValidationOutcome::Accept => {
                debug!(ip = %candidate.ip, port = candidate.port, "egress connection accepted");
                let socket = TcpSocket::new_v4()?;
                ctx.mark_accepted();
                Ok(socket)
            }
            ValidationOutcome::Reject(rejection) => {
                warn!(
                    ip = %candidate.ip,
                    port = candidate.port,
                    reason = %rejection,
                    "egress connection rejected"
                );
                ctx.record_rejection(rejection);
                Self::placeholder()
            }
        }
    }

    fn check_socket(&self, ctx: &ConnectionContext, _socket: &TcpSocket) -> bool {
        ctx.is_rejected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tracing_test::traced_test;

    fn candidate(addr: &str) -> CandidateAddress {
        CandidateAddress::tcp(addr.parse::<SocketAddr>().unwrap())
    }

    #[tokio::test]
    async fn accepted_candidate_gets_real_socket_and_no_abort() {
        let hooks = Interceptor::new(Arc::new(Policy::default()));
        let mut ctx = ConnectionContext::new();

        let socket = hooks.open_socket(&mut ctx, &candidate("93.184.216.34:443")).unwrap();
        assert_eq!(ctx.state(), ConnectionState::Accepted);
        assert!(!hooks.check_socket(&ctx, &socket));
        assert!(ctx.rejection_reason().is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn rejected_candidate_gets_placeholder_then_abort() {
        let hooks = Interceptor::new(Arc::new(Policy::default()));
        let mut ctx = ConnectionContext::new();

        let socket = hooks
            .open_socket(&mut ctx, &candidate("127.0.0.1:443"))
            .expect("rejection must still yield a socket");
        assert_eq!(ctx.state(), ConnectionState::Rejected);
        assert_eq!(ctx.rejection_reason().as_deref(), Some("Invalid IP 127.0.0.1"));
        assert!(hooks.check_socket(&ctx, &socket));
        assert!(logs_contain("egress connection rejected"));
    }

    #[tokio::test]
    async fn ipv6_candidate_is_rejected_with_placeholder() {
        let hooks = Interceptor::new(Arc::new(Policy::default()));
        let mut ctx = ConnectionContext::new();

        let socket = hooks.open_socket(&mut ctx, &candidate("[2606:4700::1]:443")).unwrap();
        assert!(hooks.check_socket(&ctx, &socket));
        assert_eq!(
            ctx.rejection_reason().as_deref(),
            Some("Invalid address family inet6")
        );
    }

    #[tokio::test]
    async fn tainted_handle_never_gets_real_socket() {
        let hooks = Interceptor::new(Arc::new(Policy::default()));
        let mut ctx = ConnectionContext::new();

        hooks.open_socket(&mut ctx, &candidate("10.0.0.1:443")).unwrap();
        let socket = hooks.open_socket(&mut ctx, &candidate("93.184.216.34:443")).unwrap();

        assert_eq!(ctx.state(), ConnectionState::Rejected);
        assert!(hooks.check_socket(&ctx, &socket));
        // The valid second candidate does not overwrite the recorded reason.
        assert_eq!(ctx.rejection_reason().as_deref(), Some("Invalid IP 10.0.0.1"));
        assert_eq!(ctx.sockets_opened(), 2);
    }

    #[tokio::test]
    async fn last_rejection_wins_across_candidates() {
        let hooks = Interceptor::new(Arc::new(Policy::default()));
        let mut ctx = ConnectionContext::new();

        hooks.open_socket(&mut ctx, &candidate("10.0.0.1:443")).unwrap();
        hooks.open_socket(&mut ctx, &candidate("192.168.0.1:443")).unwrap();
        assert_eq!(ctx.rejection_reason().as_deref(), Some("Invalid IP 192.168.0.1"));
    }
}
