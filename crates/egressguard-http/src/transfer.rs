// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single HTTP(S) request driven through the connection hooks.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, HOST, USER_AGENT};
use http::{HeaderMap, Method, Request};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpSocket, TcpStream};
use tracing::{debug, warn};
use url::{Host, Position, Url};

use egressguard_core::{
    CandidateAddress, ConnectHooks, ConnectionContext, IpResolve, Scheme, TransferEngine,
    TransferError, TransferResponse, TransferResult,
};

use crate::resolve::{Resolve, SystemResolver};
use crate::tls;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One HTTP(S) request with a hookable connection path.
///
/// For every resolved candidate the engine calls `open_socket`, then
/// `check_socket`, and stops with [`TransferError::AbortedByCallback`] as
/// soon as a check asks it to. Only I/O failures move on to the next
/// candidate. Redirects are not followed.
pub struct HttpTransfer {
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
    user_agent: String,
    connect_timeout: Duration,
    timeout: Duration,
    resolver: Arc<dyn Resolve>,
    hooks: Option<Arc<dyn ConnectHooks>>,
    allowed_schemes: Option<Vec<Scheme>>,
    ip_resolve: IpResolve,
}

impl HttpTransfer {
    /// A GET request for `url`.
    pub fn new(url: &str) -> Result<Self, TransferError> {
        let url = Url::parse(url).map_err(|e| TransferError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            user_agent: format!("egressguard/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            resolver: Arc::new(SystemResolver),
            hooks: None,
            allowed_schemes: None,
            ip_resolve: IpResolve::Any,
        })
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Timeout for connecting to a single candidate.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Timeout for the whole transfer.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn scheme(&self) -> Result<Scheme, TransferError> {
        let scheme = self
            .url
            .scheme()
            .parse::<Scheme>()
            .map_err(|_| TransferError::UnsupportedProtocol(self.url.scheme().to_string()))?;
        match &self.allowed_schemes {
            Some(allowed) if !allowed.contains(&scheme) => {
                Err(TransferError::UnsupportedProtocol(scheme.to_string()))
            }
            _ => Ok(scheme),
        }
    }

    async fn resolve(&self, port: u16) -> Result<Vec<IpAddr>, TransferError> {
        let mut ips = match self.url.host() {
            Some(Host::Ipv4(ip)) => vec![IpAddr::V4(ip)],
            Some(Host::Ipv6(ip)) => vec![IpAddr::V6(ip)],
            Some(Host::Domain(domain)) => {
                self.resolver
                    .resolve(domain, port)
                    .await
                    .map_err(|source| TransferError::Resolve {
                        host: domain.to_string(),
                        source,
                    })?
            }
            None => {
                return Err(TransferError::InvalidUrl(format!("{}: no host", self.url)));
            }
        };

        if self.ip_resolve == IpResolve::V4Only {
            ips.retain(IpAddr::is_ipv4);
        }
        if ips.is_empty() {
            return Err(TransferError::NoAddresses {
                host: self.host_name(),
            });
        }
        Ok(ips)
    }

    /// Host without IPv6 brackets, used for SNI.
    fn host_name(&self) -> String {
        match self.url.host() {
            Some(Host::Domain(d)) => d.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => String::new(),
        }
    }

    /// `Host` header value, with the port only when it is not the default.
    fn host_header(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    fn open_socket(
        &self,
        ctx: &mut ConnectionContext,
        candidate: &CandidateAddress,
    ) -> io::Result<TcpSocket> {
        match &self.hooks {
            Some(hooks) => hooks.open_socket(ctx, candidate),
            None if candidate.ip.is_ipv6() => TcpSocket::new_v6(),
            None => TcpSocket::new_v4(),
        }
    }

    fn check_socket(&self, ctx: &ConnectionContext, socket: &TcpSocket) -> bool {
        self.hooks
            .as_ref()
            .is_some_and(|hooks| hooks.check_socket(ctx, socket))
    }

    /// Walk the candidates through the hooks and return the first connection.
    async fn establish(
        &self,
        ctx: &mut ConnectionContext,
        ips: &[IpAddr],
        port: u16,
    ) -> Result<(TcpStream, SocketAddr), TransferError> {
        let mut last_error = None;

        for &ip in ips {
            let addr = SocketAddr::new(ip, port);
            let candidate = CandidateAddress::tcp(addr);

            let socket = match self.open_socket(ctx, &candidate) {
                Ok(socket) => socket,
                Err(e) => {
                    warn!(addr = %addr, error = %e, "socket creation failed");
                    last_error = Some(TransferError::SocketCreation(e));
                    continue;
                }
            };

            if self.check_socket(ctx, &socket) {
                debug!(addr = %addr, "connection aborted by pre-connect check");
                return Err(TransferError::AbortedByCallback);
            }

            match tokio::time::timeout(self.connect_timeout, socket.connect(addr)).await {
                Ok(Ok(stream)) => {
                    debug!(addr = %addr, "connected");
                    return Ok((stream, addr));
                }
                Ok(Err(source)) => {
                    debug!(addr = %addr, error = %source, "connect failed, trying next candidate");
                    last_error = Some(TransferError::Connect { addr, source });
                }
                Err(_) => {
                    debug!(addr = %addr, "connect timed out, trying next candidate");
                    last_error = Some(TransferError::Connect {
                        addr,
                        source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TransferError::NoAddresses {
            host: self.host_name(),
        }))
    }

    fn build_request(&self) -> Result<Request<Full<Bytes>>, TransferError> {
        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(&self.url[Position::BeforePath..Position::AfterQuery])
            .header(HOST, self.host_header())
            .header(USER_AGENT, self.user_agent.as_str());

        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
        }

        builder
            .body(Full::new(self.body.clone()))
            .map_err(|e| TransferError::Http(format!("invalid request: {e}")))
    }

    async fn run(&mut self, ctx: &mut ConnectionContext) -> TransferResult {
        let scheme = self.scheme()?;
        let port = self
            .url
            .port()
            .unwrap_or_else(|| scheme.default_port());
        let ips = self.resolve(port).await?;
        let (stream, remote_addr) = self.establish(ctx, &ips, port).await?;
        let request = self.build_request()?;

        let mut response = match scheme {
            Scheme::Http => send(stream, request).await?,
            Scheme::Https => {
                let config = tls::default_client_config()?;
                let tls_stream = tls::connect(config, &self.host_name(), stream).await?;
                send(tls_stream, request).await?
            }
        };
        response.remote_addr = Some(remote_addr);
        Ok(response)
    }
}

/// Send `request` over `io` with HTTP/1.1 and collect the full response.
async fn send<S>(io: S, request: Request<Full<Bytes>>) -> TransferResult
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io))
        .await
        .map_err(|e| TransferError::Http(format!("handshake failed: {e}")))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "HTTP connection closed with error");
        }
    });

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| TransferError::Http(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| TransferError::Http(format!("failed to read body: {e}")))?
        .to_bytes();

    Ok(TransferResponse {
        status,
        headers,
        body,
        remote_addr: None,
    })
}

#[async_trait]
impl TransferEngine for HttpTransfer {
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
        let limit = self.timeout;
        match tokio::time::timeout(limit, self.run(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(TransferError::Timeout(limit)),
        }
    }
}
