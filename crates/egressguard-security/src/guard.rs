// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guarded execution of a transfer.

use std::net::Ipv4Addr;
use std::sync::Arc;

use egressguard_core::{
    CandidateAddress, ConnectionContext, EgressError, FailureMode, IpResolve, Scheme,
    TransferEngine, TransferResponse, ValidationOutcome,
};
use tracing::error;

use crate::interceptor::Interceptor;
use crate::policy::Policy;

/// Runs transfers through the [`Interceptor`] and converts a recorded
/// rejection according to the policy's [`FailureMode`].
#[derive(Debug, Clone)]
pub struct SsrfGuard {
    policy: Arc<Policy>,
}

impl SsrfGuard {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    /// Install the hooks and restrict the engine to HTTP(S) over IPv4,
    /// without running anything.
    pub fn protect<E: TransferEngine + ?Sized>(&self, engine: &mut E) {
        engine.install_hooks(Arc::new(Interceptor::new(Arc::clone(&self.policy))));
        engine.restrict_protocols(&[Scheme::Http, Scheme::Https]);
        engine.set_ip_resolve(IpResolve::V4Only);
    }

    /// Protect and run `engine`.
    ///
    /// `ctx` is reset first. In `Raise` mode a recorded rejection always
    /// becomes [`EgressError::PolicyViolation`], whatever the transfer
    /// returned. In `Silent` mode the transfer's own result is returned and
    /// the rejection can be read from `ctx` afterwards.
    pub async fn execute<E: TransferEngine + ?Sized>(
        &self,
        engine: &mut E,
        ctx: &mut ConnectionContext,
    ) -> Result<TransferResponse, EgressError> {
        ctx.reset();
        self.protect(engine);

        let result = engine.perform(ctx).await;

        if let Some(reason) = ctx.rejection_reason()
            && self.policy.failure_mode() == FailureMode::Raise
        {
            error!(reason = %reason, "SSRF blocked: connection rejected by egress policy");
            return Err(EgressError::PolicyViolation { reason });
        }

        result.map_err(EgressError::from)
    }

    /// The rejection recorded for the request that owns `ctx`, if any.
    pub fn rejection_reason(&self, ctx: &ConnectionContext) -> Option<String> {
        ctx.rejection_reason()
    }

    pub fn validate_ip(&self, ip: Ipv4Addr) -> bool {
        self.policy.validate_ip(ip)
    }

    pub fn validate_port(&self, port: u16) -> bool {
        self.policy.validate_port(port)
    }

    pub fn validate_candidate(&self, candidate: &CandidateAddress) -> ValidationOutcome {
        self.policy.validate_candidate(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egressguard_test_utils::MockEngine;

    #[tokio::test]
    async fn protect_installs_hooks_and_restrictions() {
        let guard = SsrfGuard::new(Policy::default());
        let mut engine = MockEngine::new(["93.184.216.34:443"]);

        guard.protect(&mut engine);

        assert!(engine.has_hooks());
        assert_eq!(engine.allowed_schemes(), Some(&[Scheme::Http, Scheme::Https][..]));
        assert_eq!(engine.ip_resolve(), IpResolve::V4Only);
        assert_eq!(guard.policy().failure_mode(), FailureMode::Silent);
    }

    #[tokio::test]
    async fn execute_resets_stale_context() {
        let guard = SsrfGuard::new(Policy::default());
        let mut ctx = ConnectionContext::new();

        let mut bad = MockEngine::new(["127.0.0.1:443"]);
        assert!(guard.execute(&mut bad, &mut ctx).await.is_err());
        assert!(guard.rejection_reason(&ctx).is_some());

        let mut good = MockEngine::new(["93.184.216.34:443"]);
        assert!(guard.execute(&mut good, &mut ctx).await.is_ok());
        assert!(guard.rejection_reason(&ctx).is_none());
    }
}
