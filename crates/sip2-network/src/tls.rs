//! TLS negotiation helpers.
//!
//! The connection manager runs up to three kinds of handshake against an
//! ACS:
//!
//! 1. a verified handshake against the web PKI roots plus any configured
//!    trust anchors;
//! 2. a capture handshake that accepts any certificate, used only to fetch
//!    the certificate of a server whose issuer is unknown;
//! 3. a pinned handshake that accepts exactly the captured certificate.
//!
//! Handshake signatures are verified in every mode, so a peer always has to
//! hold the key of the certificate it presents.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    AlertDescription, CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore,
    SignatureScheme,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, trace};

/// Why a handshake did not produce a usable TLS stream.
#[derive(Debug, Error)]
pub(crate) enum HandshakeError {
    /// The peer does not speak TLS, or only an obsolete version of it
    #[error("peer does not speak TLS: {0}")]
    NotTls(String),

    /// The certificate chain does not end in a trusted root
    #[error("certificate issuer is not trusted: {0}")]
    UnknownIssuer(String),

    #[error("TLS handshake failed: {0}")]
    Failed(String),
}

/// Reasons a captured certificate is not an acceptable self-signed one.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SelfSignedError {
    #[error("certificate cannot be parsed: {0}")]
    Unparsable(String),

    #[error("certificate is not self-signed")]
    NotSelfSigned,

    #[error("certificate has no common name")]
    MissingCommonName,

    #[error("certificate common name {common_name:?} does not match host {host:?}")]
    HostMismatch { common_name: String, host: String },
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Client configuration that verifies certificates against the web PKI roots
/// and `extra_roots`.
pub(crate) fn trusted_config(
    extra_roots: &[CertificateDer<'static>],
) -> Result<Arc<ClientConfig>, rustls::Error> {
    let mut roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    for cert in extra_roots {
        roots.add(cert.clone())?;
    }

    let config = ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Client configuration that accepts any certificate.
pub(crate) fn capture_config() -> Result<Arc<ClientConfig>, rustls::Error> {
    let verifier = CaptureVerifier {
        provider: provider(),
    };
    custom_config(Arc::new(verifier))
}

/// Client configuration that accepts only `pinned`.
pub(crate) fn pinned_config(
    pinned: CertificateDer<'static>,
) -> Result<Arc<ClientConfig>, rustls::Error> {
    let verifier = PinnedVerifier {
        provider: provider(),
        pinned,
    };
    custom_config(Arc::new(verifier))
}

fn custom_config(verifier: Arc<dyn ServerCertVerifier>) -> Result<Arc<ClientConfig>, rustls::Error> {
    let config = ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Run a client handshake over `stream`, bounded by `timeout`.
///
/// A timeout counts as [`HandshakeError::NotTls`]: a plain SIP2 server
/// waits silently for a request and never answers a ClientHello.
pub(crate) async fn handshake(
    config: Arc<ClientConfig>,
    host: &str,
    stream: TcpStream,
    timeout: Duration,
) -> Result<TlsStream<TcpStream>, HandshakeError> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| HandshakeError::Failed(format!("invalid server name {host:?}: {e}")))?;

    let connector = TlsConnector::from(config);
    match tokio::time::timeout(timeout, connector.connect(server_name, stream)).await {
        Ok(Ok(stream)) => {
            trace!(host, "TLS handshake completed");
            Ok(stream)
        }
        Ok(Err(e)) => Err(classify(&e)),
        Err(_) => Err(HandshakeError::NotTls(format!(
            "no handshake answer within {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Map a handshake I/O error to the negotiation outcome it implies.
pub(crate) fn classify(err: &io::Error) -> HandshakeError {
    if let Some(tls) = err.get_ref().and_then(|e| e.downcast_ref::<rustls::Error>()) {
        debug!(error = ?tls, "TLS handshake error");
        return match tls {
            rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer) => {
                HandshakeError::UnknownIssuer(tls.to_string())
            }
            rustls::Error::InvalidMessage(_)
            | rustls::Error::InappropriateMessage { .. }
            | rustls::Error::InappropriateHandshakeMessage { .. }
            | rustls::Error::PeerIncompatible(_)
            | rustls::Error::AlertReceived(AlertDescription::ProtocolVersion) => {
                HandshakeError::NotTls(tls.to_string())
            }
            _ => HandshakeError::Failed(tls.to_string()),
        };
    }

    match err.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => HandshakeError::NotTls(err.to_string()),
        _ => HandshakeError::Failed(err.to_string()),
    }
}

/// End-entity certificate presented by the peer.
pub(crate) fn peer_certificate(stream: &TlsStream<TcpStream>) -> Option<CertificateDer<'static>> {
    stream
        .get_ref()
        .1
        .peer_certificates()
        .and_then(|certs| certs.first())
        .map(|cert| cert.clone().into_owned())
}

/// Accept `der` only if it is self-issued and its subject common name is
/// `host` (ASCII case-insensitive).
pub(crate) fn check_self_signed(der: &[u8], host: &str) -> Result<(), SelfSignedError> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| SelfSignedError::Unparsable(e.to_string()))?;

    if cert.issuer().as_raw() != cert.subject().as_raw() {
        return Err(SelfSignedError::NotSelfSigned);
    }

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .ok_or(SelfSignedError::MissingCommonName)?;

    if !common_name.eq_ignore_ascii_case(host) {
        return Err(SelfSignedError::HostMismatch {
            common_name: common_name.to_string(),
            host: host.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug)]
struct CaptureVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for CaptureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[derive(Debug)]
struct PinnedVerifier {
    provider: Arc<CryptoProvider>,
    pinned: CertificateDer<'static>,
}

impl ServerCertVerifier for PinnedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if end_entity.as_ref() == self.pinned.as_ref() {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
