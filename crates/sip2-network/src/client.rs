//! SIP2 client: one request, one response, checksum-driven resend.
//!
//! # Architecture
//!
//! ```text
//! Session (optional)
//!     │
//!     └─> Sip2Client ── MessageBuilder (sequence, checksum)
//!             │
//!             └─> ConnectionManager ───(TCP / TLS)───> ACS
//!                     │
//!                     └─> SipCodec (automatic framing)
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use sip2_core::Sip2Config;
//! use sip2_network::Sip2Client;
//! use sip2_protocol::commands::{Login, ScStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = Sip2Client::new(Sip2Config::new("acs.example.org", 6001));
//! client.context_mut().institution_id = "830".to_string();
//! client.connect().await?;
//!
//! let login = client.request(&Login::new("sc01", "secret")).await?;
//! assert_eq!(login.flag("Ok"), Some(true));
//!
//! let status = client.request(&ScStatus::default()).await?;
//! println!("ACS online: {:?}", status.flag("OnlineStatus"));
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Retries
//!
//! When a response fails its checksum the same request is written again,
//! unchanged, until `max_retries` resends have been spent. Transport
//! failures are never retried; they are returned to the caller.

use crate::connection::ConnectionManager;
use crate::error::{ClientError, Result};
use crate::transport::ConnectionMode;
use rustls_pki_types::CertificateDer;
use sip2_core::Sip2Config;
use sip2_protocol::{
    MessageBuilder, ParsedResponse, Request, RequestContext, checksum, commands,
};
use tracing::{Instrument, Span, debug, info_span, trace, warn};

/// Client for a single ACS connection.
///
/// All methods take `&mut self`, so at most one transaction is in flight.
pub struct Sip2Client {
    connection: ConnectionManager,

    /// Builds every outbound frame and owns the sequence counter
    builder: MessageBuilder,

    context: RequestContext,

    /// Span every network operation is instrumented with
    span: Span,

    last_request: Option<String>,
    last_response: Option<String>,

    /// Invalid responses seen in the current transaction
    retry_count: u32,
    max_retries: u32,
}

impl Sip2Client {
    /// Create a client logging into a span named after the ACS.
    pub fn new(config: Sip2Config) -> Self {
        let span = info_span!("sip2_client", host = %config.host, port = config.port);
        Self::with_span(config, span)
    }

    /// Create a client whose log events belong to `span`.
    pub fn with_span(config: Sip2Config, span: Span) -> Self {
        Self {
            builder: MessageBuilder::new(config.frame_options()),
            max_retries: config.max_retries,
            connection: ConnectionManager::new(config),
            context: RequestContext::default(),
            span,
            last_request: None,
            last_response: None,
            retry_count: 0,
        }
    }

    /// Trust `cert` as an additional root on the next [`connect`](Self::connect).
    pub fn add_trust_anchor(&mut self, cert: CertificateDer<'static>) {
        self.connection.add_trust_anchor(cert);
    }

    /// # Errors
    ///
    /// See [`ConnectionManager::connect`].
    pub async fn connect(&mut self) -> Result<ConnectionMode> {
        let span = self.span.clone();
        self.connection.connect().instrument(span).await
    }

    pub async fn disconnect(&mut self) {
        let span = self.span.clone();
        self.connection.disconnect().instrument(span).await;
    }

    /// Send `request` and return the first response that passes its
    /// checksum.
    ///
    /// # Errors
    ///
    /// - `NotConnected` before [`connect`](Self::connect)
    /// - `ConnectionReset`, `WriteTimeout` when the request cannot be written
    /// - `ReadTimeout`, `ConnectionLost`, `Protocol` when no frame is read
    /// - `ChecksumExhausted` when more than `max_retries` responses were
    ///   invalid
    pub async fn execute(&mut self, request: &str) -> Result<String> {
        let span = self.span.clone();
        self.run_transaction(request).instrument(span).await
    }

    async fn run_transaction(&mut self, request: &str) -> Result<String> {
        if !self.connection.is_connected() {
            return Err(ClientError::NotConnected);
        }

        self.retry_count = 0;
        self.last_request = Some(request.to_string());
        let options = *self.builder.options();

        loop {
            self.connection.send(request).await?;
            let response = self.connection.recv().await?;
            self.last_response = Some(response.clone());

            if checksum::verify_with(&response, &options) {
                trace!(retries = self.retry_count, "Response accepted");
                self.retry_count = 0;
                return Ok(response);
            }

            self.retry_count += 1;
            if self.retry_count > self.max_retries {
                warn!(
                    attempts = self.retry_count,
                    response = %response.escape_debug(),
                    "Giving up after repeated checksum failures"
                );
                return Err(ClientError::ChecksumExhausted {
                    attempts: self.retry_count,
                });
            }
            debug!(
                retry = self.retry_count,
                max_retries = self.max_retries,
                "Checksum failed, resending request"
            );
        }
    }

    /// Build `request`, run it and parse the answer with the request's
    /// response layout.
    ///
    /// No sequence number is used up while disconnected.
    ///
    /// # Errors
    ///
    /// `NotConnected` before anything is built. Builder argument errors and
    /// layout mismatches surface as `ClientError::Protocol`; everything else
    /// as for [`execute`](Self::execute).
    pub async fn request<R: Request + ?Sized>(&mut self, request: &R) -> Result<ParsedResponse> {
        if !self.connection.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let frame = commands::build(request, &mut self.builder, &self.context)?;
        let raw = self.execute(&frame).await?;
        let options = *self.builder.options();
        Ok(ParsedResponse::parse(&raw, request.response_layout(), &options)?)
    }

    /// Ask the ACS to repeat its last response (`97`).
    ///
    /// # Errors
    ///
    /// As for [`execute`](Self::execute).
    pub async fn request_resend(&mut self) -> Result<String> {
        if !self.connection.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let frame = commands::request_acs_resend(&mut self.builder);
        self.execute(&frame).await
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }

    pub fn builder(&self) -> &MessageBuilder {
        &self.builder
    }

    /// Last frame written by [`execute`](Self::execute).
    pub fn last_request(&self) -> Option<&str> {
        self.last_request.as_deref()
    }

    /// Last frame read, whether or not its checksum was valid.
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn mode(&self) -> Option<ConnectionMode> {
        self.connection.mode()
    }
}
