//! Client configuration.
//!
//! [`Sip2Config`] is the complete configuration surface consumed by the
//! protocol engine. Its defaults reproduce the behavior most ACS installations
//! expect: port 1294, three second timeouts, checksums and sequence numbers
//! enabled, opportunistic TLS with self-signed certificates accepted.
//!
//! The struct deserializes with serde, so it can be embedded in an
//! application's own configuration file. Every field has a default, so a
//! minimal document only names the host:
//!
//! ```
//! use sip2_core::Sip2Config;
//!
//! let config: Sip2Config = serde_json::from_str(r#"{ "host": "acs.example.org" }"#).unwrap();
//! assert_eq!(config.port, 1294);
//! assert!(config.validate().is_ok());
//! ```

use crate::{
    Result,
    constants::{
        DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_PORT, DEFAULT_SOCKET_TIMEOUT_MS,
        FIELD_TERMINATOR, MESSAGE_TERMINATOR,
    },
    error::Error,
    types::TextEncoding,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Connection and framing configuration for a SIP2 client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sip2Config {
    /// ACS host name or IP address
    pub host: String,

    /// ACS port
    pub port: u16,

    /// Timeout for connect, TLS handshake, read and write (milliseconds)
    pub socket_timeout_ms: u64,

    /// Resends allowed after a response fails its checksum
    pub max_retries: u32,

    /// Append checksums to requests and verify them on responses
    pub checksum: bool,

    /// Append sequence numbers to requests
    pub sequence: bool,

    pub field_terminator: char,

    pub message_terminator: char,

    /// Encoding of the text exchanged with the ACS
    pub encoding: TextEncoding,

    /// Largest response frame accepted, in bytes
    pub max_frame_size: usize,

    pub tls: TlsConfig,
}

impl Default for Sip2Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            socket_timeout_ms: DEFAULT_SOCKET_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            checksum: true,
            sequence: true,
            field_terminator: FIELD_TERMINATOR,
            message_terminator: MESSAGE_TERMINATOR,
            encoding: TextEncoding::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            tls: TlsConfig::default(),
        }
    }
}

impl Sip2Config {
    /// Create a configuration for `host:port` with all other values defaulted.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    /// Framing options derived from this configuration.
    #[must_use]
    pub fn frame_options(&self) -> FrameOptions {
        FrameOptions {
            field_terminator: self.field_terminator,
            message_terminator: self.message_terminator,
            checksum: self.checksum,
            sequence: self.sequence,
        }
    }

    /// Check that the configuration can be used to connect.
    ///
    /// # Errors
    /// Returns `Error::Configuration` if the host is empty, the port is 0,
    /// the timeout is 0, or both terminators are the same character.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Configuration("no host set".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Configuration(format!(
                "invalid port {} for host {}",
                self.port, self.host
            )));
        }
        if self.socket_timeout_ms == 0 {
            return Err(Error::Configuration(
                "socket timeout must be greater than 0".to_string(),
            ));
        }
        if self.field_terminator == self.message_terminator {
            return Err(Error::Configuration(format!(
                "field and message terminator must differ, both are {:?}",
                self.field_terminator
            )));
        }
        Ok(())
    }
}

/// TLS negotiation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Try to upgrade the connection to TLS
    pub enabled: bool,

    /// Trust a self-signed server certificate whose subject matches the host
    pub accept_self_signed: bool,

    /// Additional PEM encoded trust anchors
    pub ca_file: Option<PathBuf>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            accept_self_signed: true,
            ca_file: None,
        }
    }
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Framing toggles shared by the builder, the decoder and the transaction
/// runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    pub field_terminator: char,
    pub message_terminator: char,
    pub checksum: bool,
    pub sequence: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            field_terminator: FIELD_TERMINATOR,
            message_terminator: MESSAGE_TERMINATOR,
            checksum: true,
            sequence: true,
        }
    }
}

impl FrameOptions {
    /// Options with both checksum and sequence disabled.
    pub fn plain() -> Self {
        Self {
            checksum: false,
            sequence: false,
            ..Self::default()
        }
    }
}
