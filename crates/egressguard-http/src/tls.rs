// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TLS client setup for HTTPS transfers.
//!
//! rustls only speaks TLS 1.2 and 1.3, so the protocol floor is TLS 1.2.
//! Trust anchors come from the bundled Mozilla root set.

use std::sync::Arc;

use egressguard_core::TransferError;
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::error;

/// Client config trusting the webpki roots and offering HTTP/1.1 via ALPN.
///
/// The crypto provider is named explicitly so the config never depends on a
/// process-wide default being installed.
pub fn default_client_config() -> Result<Arc<ClientConfig>, TransferError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransferError::Tls(format!("unsupported protocol versions: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

/// Run the TLS handshake over an already connected stream.
pub async fn connect(
    config: Arc<ClientConfig>,
    server_name: &str,
    stream: TcpStream,
) -> Result<TlsStream<TcpStream>, TransferError> {
    let name = ServerName::try_from(server_name.to_string())
        .map_err(|e| TransferError::Tls(format!("invalid server name `{server_name}`: {e}")))?;

    TlsConnector::from(config)
        .connect(name, stream)
        .await
        .map_err(|e| {
            error!(server = %server_name, error = %e, "TLS handshake failed");
            TransferError::Tls(e.to_string())
        })
}
