// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the interception protocol through `SsrfGuard`.
//!
//! Each test drives a scripted `MockEngine`, so addresses that cannot be
//! served locally (documentation ranges, metadata endpoints) can be used.

use std::net::Ipv4Addr;
use std::sync::Arc;

use egressguard_core::{
    ConnectionContext, ConnectionState, EgressError, FailureMode, TransferError,
};
use egressguard_security::{Policy, SsrfGuard, StaticLocalAddress};
use egressguard_test_utils::{ConnectionPath, MockEngine};

fn loopback_policy(mode: FailureMode) -> Policy {
    Policy::builder()
        .detect_local_addresses(true)
        .local_address_detector(Arc::new(StaticLocalAddress(None)))
        .failure_mode(mode)
        .build()
        .unwrap()
}

// ---- Rejection of a loopback-only host ----

#[tokio::test]
async fn loopback_target_raises_policy_violation() {
    let guard = SsrfGuard::new(loopback_policy(FailureMode::Raise));
    let mut engine = MockEngine::new(["127.0.0.1:443"]);
    let mut ctx = ConnectionContext::new();

    let err = guard.execute(&mut engine, &mut ctx).await.unwrap_err();
    match err {
        EgressError::PolicyViolation { reason } => assert_eq!(reason, "Invalid IP 127.0.0.1"),
        other => panic!("expected policy violation, got {other:?}"),
    }
    assert_eq!(
        guard.rejection_reason(&ctx).as_deref(),
        Some("Invalid IP 127.0.0.1")
    );
    assert_eq!(
        engine.paths(),
        &[ConnectionPath::Aborted("127.0.0.1:443".parse().unwrap())]
    );
}

#[tokio::test]
async fn loopback_target_fails_silently_without_data() {
    let guard = SsrfGuard::new(loopback_policy(FailureMode::Silent));
    let mut engine = MockEngine::new(["127.0.0.1:443"]);
    let mut ctx = ConnectionContext::new();

    let err = guard.execute(&mut engine, &mut ctx).await.unwrap_err();
    assert!(
        matches!(err, EgressError::Transfer(TransferError::AbortedByCallback)),
        "silent mode must surface the engine's own failure, got {err:?}"
    );
    assert_eq!(ctx.state(), ConnectionState::Rejected);
    assert_eq!(ctx.rejection_reason().as_deref(), Some("Invalid IP 127.0.0.1"));
}

// ---- Whitelist overriding the default blacklist ----

#[tokio::test]
async fn whitelisted_documentation_range_takes_real_socket_path() {
    let policy = Policy::builder()
        .ip_whitelist(["203.0.113.0/24"])
        .failure_mode(FailureMode::Raise)
        .build()
        .unwrap();
    let guard = SsrfGuard::new(policy);
    let mut engine = MockEngine::new(["203.0.113.5:443"]).respond_with(200, "ok");
    let mut ctx = ConnectionContext::new();

    let response = guard.execute(&mut engine, &mut ctx).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(&response.body[..], b"ok");
    assert_eq!(ctx.state(), ConnectionState::Accepted);
    assert!(ctx.rejection_reason().is_none());
    assert_eq!(
        engine.paths(),
        &[ConnectionPath::Connected("203.0.113.5:443".parse().unwrap())]
    );
}

#[tokio::test]
async fn documentation_range_is_blocked_without_whitelist() {
    let guard = SsrfGuard::new(Policy::default());
    let mut engine = MockEngine::new(["203.0.113.5:443"]);
    let mut ctx = ConnectionContext::new();

    assert!(guard.execute(&mut engine, &mut ctx).await.is_err());
    assert_eq!(ctx.rejection_reason().as_deref(), Some("Invalid IP 203.0.113.5"));
}

// ---- Other rejection kinds ----

#[tokio::test]
async fn disallowed_port_is_reported_before_ip() {
    let guard = SsrfGuard::new(Policy::default());
    let mut engine = MockEngine::new(["169.254.169.254:22"]);
    let mut ctx = ConnectionContext::new();

    assert!(guard.execute(&mut engine, &mut ctx).await.is_err());
    assert_eq!(ctx.rejection_reason().as_deref(), Some("Invalid port 22"));
}

#[tokio::test]
async fn local_address_is_rejected_when_detected() {
    let public = Ipv4Addr::new(93, 184, 216, 34);
    let policy = Policy::builder()
        .detect_local_addresses(true)
        .local_address_detector(Arc::new(StaticLocalAddress(Some(public))))
        .failure_mode(FailureMode::Raise)
        .build()
        .unwrap();
    let guard = SsrfGuard::new(policy);
    let mut engine = MockEngine::new(["93.184.216.34:443"]);
    let mut ctx = ConnectionContext::new();

    let err = guard.execute(&mut engine, &mut ctx).await.unwrap_err();
    assert!(matches!(err, EgressError::PolicyViolation { .. }));
}

// ---- Multiple candidates ----

#[tokio::test]
async fn ipv6_candidates_are_filtered_before_hooks() {
    let guard = SsrfGuard::new(Policy::default());
    let mut engine = MockEngine::new(["[2606:4700::1]:443", "93.184.216.34:443"]);
    let mut ctx = ConnectionContext::new();

    guard.execute(&mut engine, &mut ctx).await.unwrap();
    assert_eq!(
        engine.paths(),
        &[
            ConnectionPath::Filtered("[2606:4700::1]:443".parse().unwrap()),
            ConnectionPath::Connected("93.184.216.34:443".parse().unwrap()),
        ]
    );
    assert_eq!(ctx.sockets_opened(), 1);
}

#[tokio::test]
async fn engine_retrying_after_rejection_stays_blocked() {
    let guard = SsrfGuard::new(Policy::default());
    let mut engine = MockEngine::new(["10.0.0.1:443", "192.168.0.1:443", "93.184.216.34:443"])
        .keep_trying_after_abort(true);
    let mut ctx = ConnectionContext::new();

    let err = guard.execute(&mut engine, &mut ctx).await.unwrap_err();
    assert!(matches!(err, EgressError::Transfer(TransferError::AbortedByCallback)));
    // The last rejection observed is kept; the valid third candidate is refused too.
    assert_eq!(ctx.rejection_reason().as_deref(), Some("Invalid IP 192.168.0.1"));
    assert!(engine
        .paths()
        .iter()
        .all(|p| matches!(p, ConnectionPath::Aborted(_))));
}

#[tokio::test]
async fn raise_mode_overrides_engine_success() {
    // An engine that ignores the check hook would "succeed" against the
    // placeholder; raise mode must still report the violation.
    struct IgnoringEngine(MockEngine);

    #[async_trait::async_trait]
    impl egressguard_core::TransferEngine for IgnoringEngine {
        fn install_hooks(&mut self, hooks: Arc<dyn egressguard_core::ConnectHooks>) {
            self.0.install_hooks(hooks);
        }
        fn restrict_protocols(&mut self, schemes: &[egressguard_core::Scheme]) {
            self.0.restrict_protocols(schemes);
        }
        fn set_ip_resolve(&mut self, resolve: egressguard_core::IpResolve) {
            self.0.set_ip_resolve(resolve);
        }
        async fn perform(
            &mut self,
            ctx: &mut ConnectionContext,
        ) -> egressguard_core::TransferResult {
            let _ = self.0.perform(ctx).await;
            Ok(egressguard_core::TransferResponse {
                status: 200,
                headers: Default::default(),
                body: Default::default(),
                remote_addr: None,
            })
        }
    }

    let guard = SsrfGuard::new(loopback_policy(FailureMode::Raise));
    let mut engine = IgnoringEngine(MockEngine::new(["127.0.0.1:443"]));
    let mut ctx = ConnectionContext::new();

    let err = guard.execute(&mut engine, &mut ctx).await.unwrap_err();
    assert!(matches!(err, EgressError::PolicyViolation { .. }));
}

#[tokio::test]
async fn guard_shares_policy_across_concurrent_requests() {
    let guard = Arc::new(SsrfGuard::new(Policy::default()));

    let mut handles = Vec::new();
    for (i, addr) in ["93.184.216.34:443", "10.0.0.1:443", "8.8.8.8:80", "127.0.0.1:80"]
        .into_iter()
        .enumerate()
    {
        let guard = Arc::clone(&guard);
        handles.push(tokio::spawn(async move {
            let mut engine = MockEngine::new([addr]);
            let mut ctx = ConnectionContext::new();
            let ok = guard.execute(&mut engine, &mut ctx).await.is_ok();
            (i, ok, ctx.rejection_reason())
        }));
    }

    for handle in handles {
        let (i, ok, reason) = handle.await.unwrap();
        let expect_ok = i % 2 == 0;
        assert_eq!(ok, expect_ok, "request {i}");
        assert_eq!(reason.is_none(), expect_ok, "request {i}");
    }
}
