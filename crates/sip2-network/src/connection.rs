//! Connection establishment and framed transport.
//!
//! # Negotiation
//!
//! ```text
//! Disconnected
//!     │ TCP connect (socket timeout)
//!     ├─ TLS disabled ───────────────────────────────> Plain
//!     │ verified handshake
//!     ├─ ok ─────────────────────────────────────────> TlsTrusted
//!     ├─ peer does not speak TLS ── reopen socket ───> PlainFallback
//!     ├─ unknown issuer
//!     │     ├─ self-signed not accepted ─────────────> Connection error
//!     │     └─ capture cert, reopen, pinned handshake,
//!     │        issuer == subject and CN == host ─────> TlsSelfSigned
//!     └─ anything else ──────────────────────────────> Connection error
//! ```
//!
//! There is no reconnect loop: a failed negotiation leaves the manager
//! disconnected and the caller decides whether to try again.

use crate::error::{ClientError, Result};
use crate::tls::{self, HandshakeError};
use crate::transport::{ConnectionMode, Transport};
use futures::{SinkExt, StreamExt};
use rustls_pki_types::CertificateDer;
use rustls_pki_types::pem::PemObject;
use sip2_core::Sip2Config;
use sip2_protocol::SipCodec;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, trace, warn};

/// Owns the socket to one ACS and moves whole frames over it.
pub struct ConnectionManager {
    config: Sip2Config,

    /// Trust anchors in addition to the web PKI roots
    trust_anchors: Vec<CertificateDer<'static>>,

    /// Framed transport (None if not connected)
    framed: Option<Framed<Transport, SipCodec>>,

    mode: Option<ConnectionMode>,
}

impl ConnectionManager {
    pub fn new(config: Sip2Config) -> Self {
        debug!(host = %config.host, port = config.port, "Creating connection manager");

        Self {
            config,
            trust_anchors: Vec::new(),
            framed: None,
            mode: None,
        }
    }

    /// Trust `cert` as an additional root for verified handshakes.
    pub fn add_trust_anchor(&mut self, cert: CertificateDer<'static>) {
        self.trust_anchors.push(cert);
    }

    pub fn config(&self) -> &Sip2Config {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// How the current connection was established, `None` when disconnected.
    pub fn mode(&self) -> Option<ConnectionMode> {
        self.mode
    }

    fn timeout_ms(&self) -> u64 {
        self.config.socket_timeout_ms
    }

    fn connection_error(&self, reason: impl ToString) -> ClientError {
        ClientError::connection(&self.config.host, self.config.port, reason)
    }

    /// Connect to the ACS, negotiating TLS when enabled.
    ///
    /// An existing connection is closed first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` for an unusable configuration and
    /// `ClientError::Connection` for every failure to reach the ACS or to
    /// agree on a transport.
    pub async fn connect(&mut self) -> Result<ConnectionMode> {
        self.config
            .validate()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        let codec = SipCodec::from_config(&self.config)
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        self.disconnect().await;

        info!(
            host = %self.config.host,
            port = self.config.port,
            tls = self.config.tls.enabled,
            "Connecting to ACS"
        );

        let (transport, mode) = self.negotiate().await?;

        info!(host = %self.config.host, port = self.config.port, %mode, "Connected to ACS");
        self.framed = Some(Framed::new(transport, codec));
        self.mode = Some(mode);
        Ok(mode)
    }

    async fn negotiate(&self) -> Result<(Transport, ConnectionMode)> {
        let stream = self.open_socket().await?;
        if !self.config.tls.enabled {
            return Ok((Transport::Plain(stream), ConnectionMode::Plain));
        }

        let timeout = self.config.socket_timeout();
        let host = self.config.host.as_str();
        let trusted = tls::trusted_config(&self.load_trust_anchors()?)
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        match tls::handshake(trusted, host, stream, timeout).await {
            Ok(stream) => Ok((Transport::Tls(Box::new(stream)), ConnectionMode::TlsTrusted)),
            Err(HandshakeError::NotTls(reason)) => {
                info!(host, %reason, "ACS does not speak TLS, falling back to plain TCP");
                let stream = self.open_socket().await?;
                Ok((Transport::Plain(stream), ConnectionMode::PlainFallback))
            }
            Err(HandshakeError::UnknownIssuer(reason)) => {
                if !self.config.tls.accept_self_signed {
                    error!(host, %reason, "Untrusted certificate and self-signed certificates are not accepted");
                    return Err(self.connection_error(reason));
                }
                warn!(host, %reason, "Untrusted certificate, checking for a self-signed one");
                let stream = self.self_signed_handshake().await?;
                Ok((Transport::Tls(Box::new(stream)), ConnectionMode::TlsSelfSigned))
            }
            Err(e @ HandshakeError::Failed(_)) => {
                error!(host, error = %e, "TLS negotiation failed");
                Err(self.connection_error(e))
            }
        }
    }

    /// Capture the certificate on a throwaway connection, then handshake
    /// again trusting exactly that certificate.
    async fn self_signed_handshake(&self) -> Result<TlsStream<TcpStream>> {
        let timeout = self.config.socket_timeout();
        let host = self.config.host.as_str();

        let capture =
            tls::capture_config().map_err(|e| ClientError::Configuration(e.to_string()))?;
        let stream = self.open_socket().await?;
        let mut captured = tls::handshake(capture, host, stream, timeout)
            .await
            .map_err(|e| self.connection_error(e))?;
        let cert = tls::peer_certificate(&captured)
            .ok_or_else(|| self.connection_error("server presented no certificate"))?;
        if let Err(e) = tokio::time::timeout(Duration::from_millis(500), captured.shutdown()).await
        {
            trace!(host, error = %e, "Capture connection shutdown timed out");
        }
        drop(captured);

        tls::check_self_signed(&cert, host).map_err(|e| {
            error!(host, error = %e, "Rejecting server certificate");
            self.connection_error(e)
        })?;

        let pinned =
            tls::pinned_config(cert).map_err(|e| ClientError::Configuration(e.to_string()))?;
        let stream = self.open_socket().await?;
        tls::handshake(pinned, host, stream, timeout)
            .await
            .map_err(|e| self.connection_error(e))
    }

    async fn open_socket(&self) -> Result<TcpStream> {
        let addr = (self.config.host.as_str(), self.config.port);
        let stream = match tokio::time::timeout(self.config.socket_timeout(), TcpStream::connect(addr))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                error!(host = %self.config.host, port = self.config.port, error = %e, "Connection failed");
                return Err(self.connection_error(e));
            }
            Err(_) => {
                warn!("Connection timeout after {}ms", self.timeout_ms());
                return Err(self.connection_error(format!(
                    "connect timeout after {}ms",
                    self.timeout_ms()
                )));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        Ok(stream)
    }

    fn load_trust_anchors(&self) -> Result<Vec<CertificateDer<'static>>> {
        let mut anchors = self.trust_anchors.clone();
        if let Some(path) = &self.config.tls.ca_file {
            let certs = CertificateDer::pem_file_iter(path).map_err(|e| {
                ClientError::Configuration(format!("cannot read {}: {e:?}", path.display()))
            })?;
            for cert in certs {
                let cert = cert.map_err(|e| {
                    ClientError::Configuration(format!("bad certificate in {}: {e:?}", path.display()))
                })?;
                anchors.push(cert);
            }
            debug!(path = %path.display(), count = anchors.len(), "Loaded trust anchors");
        }
        Ok(anchors)
    }

    /// Write one frame.
    ///
    /// # Errors
    ///
    /// `NotConnected`, `WriteTimeout`, `ConnectionReset` when the socket
    /// rejects the write, or `Protocol` when the frame cannot be encoded.
    pub async fn send(&mut self, frame: &str) -> Result<()> {
        let timeout = self.config.socket_timeout();
        let framed = self.framed.as_mut().ok_or(ClientError::NotConnected)?;

        trace!(frame, "Sending frame to ACS");
        match tokio::time::timeout(timeout, framed.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(sip2_core::Error::Io(e))) => {
                error!("Failed to send frame: {}", e);
                Err(ClientError::ConnectionReset(e.to_string()))
            }
            Ok(Err(e)) => {
                error!("Failed to encode frame: {}", e);
                Err(ClientError::Protocol(e))
            }
            Err(_) => {
                warn!("Send timeout after {}ms", timeout.as_millis());
                Err(ClientError::WriteTimeout(self.timeout_ms()))
            }
        }
    }

    /// Read one frame, terminator included.
    ///
    /// # Errors
    ///
    /// `NotConnected`, `ReadTimeout`, `ConnectionLost` when the ACS closes
    /// the socket, or `Protocol` for oversized or badly encoded frames.
    pub async fn recv(&mut self) -> Result<String> {
        let timeout = self.config.socket_timeout();
        let framed = self.framed.as_mut().ok_or(ClientError::NotConnected)?;

        match tokio::time::timeout(timeout, framed.next()).await {
            Ok(Some(Ok(frame))) => {
                trace!(frame = %frame, "Received frame from ACS");
                Ok(frame)
            }
            Ok(Some(Err(e))) => {
                error!("Failed to decode frame: {}", e);
                Err(ClientError::Protocol(e))
            }
            Ok(None) => {
                warn!("Connection closed by ACS");
                Err(ClientError::ConnectionLost(
                    "ACS closed connection".to_string(),
                ))
            }
            Err(_) => {
                warn!("Receive timeout after {}ms", timeout.as_millis());
                Err(ClientError::ReadTimeout(self.timeout_ms()))
            }
        }
    }

    /// Close the connection gracefully.
    ///
    /// Idempotent. Flush and shutdown are bounded by 500ms each. On a TLS
    /// connection the shutdown sends `close_notify`.
    ///
    /// Dropping a connected manager closes the socket without flushing and,
    /// for TLS, without `close_notify`. Call `disconnect().await` first when
    /// the ACS should see a clean close.
    pub async fn disconnect(&mut self) {
        self.mode = None;
        let Some(mut framed) = self.framed.take() else {
            return;
        };
        info!(host = %self.config.host, port = self.config.port, "Closing connection");

        let flush_timeout = Duration::from_millis(500);
        let flush = SinkExt::<&str>::flush(&mut framed);
        match tokio::time::timeout(flush_timeout, flush).await {
            Ok(Ok(())) => debug!("Flush completed"),
            Ok(Err(e)) => warn!("Error flushing during close: {}", e),
            Err(_) => warn!("Flush timeout during close ({}ms)", flush_timeout.as_millis()),
        }

        let mut transport = framed.into_inner();
        let shutdown_timeout = Duration::from_millis(500);
        match tokio::time::timeout(shutdown_timeout, transport.shutdown()).await {
            Ok(Ok(())) => debug!("Shutdown completed"),
            Ok(Err(e)) => warn!("Error during shutdown: {}", e),
            Err(_) => warn!(
                "Shutdown timeout during close ({}ms)",
                shutdown_timeout.as_millis()
            ),
        }

        debug!("Connection closed");
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if self.framed.is_some() {
            debug!("ConnectionManager dropped while connected - connection will be closed");
        }
    }
}
