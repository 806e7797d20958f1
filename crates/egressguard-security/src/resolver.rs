// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Policy enforcement for `reqwest` clients.
//!
//! reqwest exposes no socket-creation hook, but it only ever dials the
//! addresses its DNS resolver returns. [`PolicyResolver`] filters those
//! addresses through the [`Policy`], which closes the DNS rebinding window
//! the same way the interceptor does. Literal-IP URLs never reach the
//! resolver, so [`GuardedClient`] checks every request URL with
//! [`validate_url`] before sending it, and the redirect policy repeats the
//! check on every hop.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use egressguard_core::{EgressError, Rejection, TransferError};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::{debug, error};
use url::{Host, Url};

use crate::policy::Policy;

/// Maximum redirect hops followed by [`build_guarded_client`].
const MAX_REDIRECTS: usize = 10;

/// DNS resolver that only returns IPv4 addresses the policy allows.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    policy: Arc<Policy>,
}

impl PolicyResolver {
    pub fn new(policy: Arc<Policy>) -> Self {
        Self { policy }
    }
}

impl Resolve for PolicyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let policy = Arc::clone(&self.policy);
        let hostname = name.as_str().to_string();

        Box::pin(async move {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((hostname.as_str(), 0))
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?
                .collect();

            let allowed: Vec<SocketAddr> = addrs
                .into_iter()
                .filter(|addr| match addr.ip() {
                    IpAddr::V4(v4) if policy.validate_ip(v4) => true,
                    ip => {
                        error!(ip = %ip, host = %hostname, "SSRF blocked: resolved to disallowed address");
                        false
                    }
                })
                .collect();

            if allowed.is_empty() {
                let err: Box<dyn std::error::Error + Send + Sync> = format!(
                    "SSRF blocked: {hostname} resolves only to disallowed addresses"
                )
                .into();
                return Err(err);
            }

            debug!(host = %hostname, count = allowed.len(), "resolved to allowed addresses");
            let addrs: Addrs = Box::new(allowed.into_iter());
            Ok(addrs)
        })
    }
}

/// Static check of a URL against the policy.
///
/// The scheme must be http or https and the effective port must pass the
/// port rules. A literal IPv4 host must pass the IP rules; a literal IPv6
/// host is always refused. Host names are left to the resolver.
pub fn validate_url(policy: &Policy, url: &str) -> Result<(), EgressError> {
    let parsed =
        Url::parse(url).map_err(|e| TransferError::InvalidUrl(format!("{url}: {e}")))?;
    check_parsed_url(policy, &parsed)
}

fn check_parsed_url(policy: &Policy, url: &Url) -> Result<(), EgressError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TransferError::UnsupportedProtocol(url.scheme().to_string()).into());
    }

    let port = url
        .port_or_known_default()
        .ok_or_else(|| TransferError::InvalidUrl(format!("{url}: no port")))?;
    if !policy.validate_port(port) {
        return Err(violation(Rejection::PortNotAllowed(port)));
    }

    match url.host() {
        Some(Host::Ipv4(ip)) if !policy.validate_ip(ip) => {
            Err(violation(Rejection::IpNotAllowed(IpAddr::V4(ip))))
        }
        Some(Host::Ipv6(ip)) => Err(violation(Rejection::IpNotAllowed(IpAddr::V6(ip)))),
        Some(_) => Ok(()),
        None => Err(TransferError::InvalidUrl(format!("{url}: no host")).into()),
    }
}

fn violation(rejection: Rejection) -> EgressError {
    EgressError::PolicyViolation {
        reason: rejection.to_string(),
    }
}

/// A `reqwest::Client` whose requests are checked against the policy.
///
/// The initial URL goes through [`validate_url`] before anything is sent,
/// which covers literal-IP hosts and ports that the resolver never sees.
/// Host names are filtered again by [`PolicyResolver`] and every redirect
/// hop is checked by the redirect policy.
#[derive(Debug, Clone)]
pub struct GuardedClient {
    client: reqwest::Client,
    policy: Arc<Policy>,
}

impl GuardedClient {
    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    /// Start a request after checking `url`.
    pub fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> Result<reqwest::RequestBuilder, EgressError> {
        let parsed =
            Url::parse(url).map_err(|e| TransferError::InvalidUrl(format!("{url}: {e}")))?;
        self.check(&parsed)?;
        Ok(self.client.request(method, parsed))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, EgressError> {
        self.request(reqwest::Method::GET, url)
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, EgressError> {
        self.request(reqwest::Method::POST, url)
    }

    /// Check and send a prepared request.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, EgressError> {
        self.check(request.url())?;
        self.client
            .execute(request)
            .await
            .map_err(|e| TransferError::Http(e.to_string()).into())
    }

    fn check(&self, url: &Url) -> Result<(), EgressError> {
        check_parsed_url(&self.policy, url).inspect_err(|e| {
            error!(url = %url, error = %e, "SSRF blocked: request target refused");
        })
    }
}

/// Build a [`GuardedClient`] that enforces `policy`.
///
/// - Minimum TLS 1.2.
/// - [`PolicyResolver`] for every host name lookup.
/// - The initial URL and every redirect target must pass [`validate_url`].
pub fn build_guarded_client(policy: Arc<Policy>) -> Result<GuardedClient, EgressError> {
    let redirect_policy = Arc::clone(&policy);
    let redirect = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match check_parsed_url(&redirect_policy, attempt.url()) {
            Ok(()) => attempt.follow(),
            Err(e) => {
                error!(url = %attempt.url(), error = %e, "SSRF blocked: redirect target refused");
                attempt.stop()
            }
        }
    });

    let client = reqwest::Client::builder()
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .dns_resolver(Arc::new(PolicyResolver::new(Arc::clone(&policy))))
        .redirect(redirect)
        .build()
        .map_err(|e| {
            error!("failed to build guarded HTTP client: {e}");
            EgressError::Internal(format!("failed to build guarded HTTP client: {e}"))
        })?;

    Ok(GuardedClient { client, policy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn validate_url_blocks_private_literal_ip() {
        let policy = Policy::default();
        for url in [
            "http://10.0.0.1:8080/api",
            "http://192.168.1.1/admin",
            "http://127.0.0.1/internal",
            "http://169.254.169.254/latest/meta-data/",
        ] {
            assert!(
                matches!(validate_url(&policy, url), Err(EgressError::PolicyViolation { .. })),
                "{url} should be blocked"
            );
        }
    }

    #[test]
    fn validate_url_reports_reason() {
        let err = validate_url(&Policy::default(), "http://127.0.0.1/").unwrap_err();
        assert_eq!(err.to_string(), "policy violation: Invalid IP 127.0.0.1");
    }

    #[test]
    fn validate_url_allows_public_ip_and_hostnames() {
        let policy = Policy::default();
        assert!(validate_url(&policy, "https://8.8.8.8/dns").is_ok());
        assert!(validate_url(&policy, "https://example.com/").is_ok());
    }

    #[test]
    fn validate_url_checks_port_and_scheme() {
        let policy = Policy::default();
        assert!(matches!(
            validate_url(&policy, "http://example.com:22/"),
            Err(EgressError::PolicyViolation { .. })
        ));
        assert!(matches!(
            validate_url(&policy, "ftp://example.com/"),
            Err(EgressError::Transfer(TransferError::UnsupportedProtocol(_)))
        ));
        assert!(matches!(
            validate_url(&policy, "not a url"),
            Err(EgressError::Transfer(TransferError::InvalidUrl(_)))
        ));
    }

    #[test]
    fn validate_url_refuses_ipv6_literals() {
        assert!(validate_url(&Policy::default(), "http://[2606:4700::1]/").is_err());
    }

    #[test]
    fn build_guarded_client_succeeds() {
        assert!(build_guarded_client(Arc::new(Policy::default())).is_ok());
    }

    /// Answer every connection with a 302 to `location` and count them.
    async fn redirect_stub(location: Option<String>) -> (SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let location = location.unwrap_or_else(|| format!("http://{addr}/again"));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        (addr, hits)
    }

    fn loopback_allowed() -> Arc<Policy> {
        Arc::new(
            Policy::builder()
                .ip_whitelist(["127.0.0.1/32"])
                .port_whitelist([])
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn guarded_client_refuses_literal_loopback_before_connecting() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let policy = Arc::new(Policy::builder().port_whitelist([]).build().unwrap());
        let client = build_guarded_client(policy).unwrap();

        let err = client
            .get(&format!("http://127.0.0.1:{port}/"))
            .unwrap_err();
        assert_eq!(err.to_string(), "policy violation: Invalid IP 127.0.0.1");

        let request = reqwest::Request::new(
            reqwest::Method::GET,
            Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap(),
        );
        assert!(matches!(
            client.execute(request).await,
            Err(EgressError::PolicyViolation { .. })
        ));

        let accepted =
            tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(accepted.is_err(), "refused request must not connect");
    }

    #[test]
    fn guarded_client_refuses_disallowed_port_on_host_name() {
        let client = build_guarded_client(Arc::new(Policy::default())).unwrap();
        assert!(client.policy().port_whitelist().contains(&443));
        let err = client.get("http://example.com:22/").unwrap_err();
        assert_eq!(err.to_string(), "policy violation: Invalid port 22");
        assert!(client.post("https://example.com/").is_ok());
    }

    #[tokio::test]
    async fn redirect_to_blacklisted_address_is_not_followed() {
        let (addr, hits) =
            redirect_stub(Some("http://169.254.169.254/latest/meta-data/".to_string())).await;
        let client = build_guarded_client(loopback_allowed()).unwrap();

        let request = client
            .get(&format!("http://{addr}/"))
            .unwrap()
            .build()
            .unwrap();
        let response = client.execute(request).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FOUND);
        assert_eq!(
            response.headers()[reqwest::header::LOCATION],
            "http://169.254.169.254/latest/meta-data/"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn redirect_chain_stops_after_limit() {
        let (addr, hits) = redirect_stub(None).await;
        let client = build_guarded_client(loopback_allowed()).unwrap();

        let request = client
            .get(&format!("http://{addr}/"))
            .unwrap()
            .build()
            .unwrap();
        assert!(client.execute(request).await.is_err());
        let served = hits.load(Ordering::SeqCst);
        assert!(
            served <= MAX_REDIRECTS + 1,
            "followed {served} hops past the limit"
        );
    }

    #[tokio::test]
    async fn resolver_refuses_loopback_names() {
        let resolver = PolicyResolver::new(Arc::new(Policy::default()));
        let name: Name = "localhost".parse().unwrap();
        assert!(resolver.resolve(name).await.is_err());
    }
}
