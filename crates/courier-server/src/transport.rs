//! QUIC transport via Quinn.
//!
//! Clients send request frames on bidirectional streams; the server pushes
//! events on unidirectional streams. TLS comes from PEM files when
//! configured, otherwise a self-signed certificate is generated for
//! development use.

use std::{net::SocketAddr, sync::Arc};

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::error::ServerError;

/// ALPN protocol identifier.
const ALPN: &[u8] = b"courier/1";

/// QUIC server endpoint.
pub struct QuinnTransport {
    endpoint: quinn::Endpoint,
}

impl QuinnTransport {
    /// Bind a QUIC endpoint on `bind_address`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` for an unparseable address or bad TLS
    /// material, `ServerError::Transport` if binding fails.
    pub fn bind(
        bind_address: &str,
        cert_path: Option<&str>,
        key_path: Option<&str>,
    ) -> Result<Self, ServerError> {
        let addr: SocketAddr = bind_address
            .parse()
            .map_err(|_| ServerError::Config(format!("invalid bind address: {bind_address}")))?;

        let (certs, key) = match (cert_path, key_path) {
            (Some(cert), Some(key)) => load_pem(cert, key)?,
            _ => self_signed()?,
        };

        let mut crypto = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| ServerError::Config(format!("TLS configuration: {e}")))?;
        crypto.alpn_protocols = vec![ALPN.to_vec()];

        let server_config = quinn::ServerConfig::with_crypto(Arc::new(
            quinn::crypto::rustls::QuicServerConfig::try_from(crypto)
                .map_err(|e| ServerError::Config(format!("QUIC TLS configuration: {e}")))?,
        ));

        let endpoint = quinn::Endpoint::server(server_config, addr)?;

        Ok(Self { endpoint })
    }

    /// Accept the next incoming connection.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Transport` if the endpoint is closed or the
    /// handshake fails.
    pub async fn accept(&self) -> Result<QuinnConnection, ServerError> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or_else(|| ServerError::Transport("endpoint closed".to_owned()))?;

        let connection =
            incoming.await.map_err(|e| ServerError::Transport(e.to_string()))?;

        Ok(QuinnConnection { inner: connection })
    }

    /// Local address the endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.endpoint.local_addr().map_err(ServerError::from)
    }
}

/// One live QUIC connection.
#[derive(Clone)]
pub struct QuinnConnection {
    inner: quinn::Connection,
}

impl QuinnConnection {
    /// Accept the next bidirectional stream from the client.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Transport` when the connection is closed.
    pub async fn accept_bi(
        &self,
    ) -> Result<(quinn::SendStream, quinn::RecvStream), ServerError> {
        self.inner.accept_bi().await.map_err(|e| ServerError::Transport(e.to_string()))
    }

    /// Open a unidirectional stream for pushing an event to the client.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Transport` when the connection is closed.
    pub async fn open_uni(&self) -> Result<quinn::SendStream, ServerError> {
        self.inner.open_uni().await.map_err(|e| ServerError::Transport(e.to_string()))
    }

    /// Close the connection with an application-level reason.
    pub fn close(&self, reason: &str) {
        self.inner.close(quinn::VarInt::from_u32(0), reason.as_bytes());
    }

    /// Remote peer address.
    pub fn remote_address(&self) -> SocketAddr {
        self.inner.remote_address()
    }
}

impl std::fmt::Debug for QuinnConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuinnConnection")
            .field("remote", &self.inner.remote_address())
            .finish()
    }
}

/// Load certificate chain and private key from PEM files.
fn load_pem(
    cert_path: &str,
    key_path: &str,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ServerError> {
    let cert_pem = std::fs::read(cert_path)
        .map_err(|e| ServerError::Config(format!("reading {cert_path}: {e}")))?;
    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Config(format!("parsing {cert_path}: {e}")))?;
    if certs.is_empty() {
        return Err(ServerError::Config(format!("no certificates in {cert_path}")));
    }

    let key_pem = std::fs::read(key_path)
        .map_err(|e| ServerError::Config(format!("reading {key_path}: {e}")))?;
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|e| ServerError::Config(format!("parsing {key_path}: {e}")))?
        .ok_or_else(|| ServerError::Config(format!("no private key in {key_path}")))?;

    Ok((certs, key))
}

/// Generate a self-signed certificate for development.
fn self_signed() -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ServerError> {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()])
        .map_err(|e| ServerError::Config(format!("self-signed certificate: {e}")))?;

    let cert = certified.cert.der().clone();
    let key = PrivateKeyDer::from(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

    Ok((vec![cert], key))
}
