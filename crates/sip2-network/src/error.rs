//! Transport level errors.

use thiserror::Error;

/// Errors that can occur while connecting to or talking with an ACS
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration rejected before any socket was opened
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection could not be established (TCP or TLS)
    #[error("Cannot connect to {host}:{port}: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },

    /// Client is not connected to the ACS
    #[error("Not connected to ACS")]
    NotConnected,

    /// Writing the request failed
    #[error("Connection reset while sending: {0}")]
    ConnectionReset(String),

    /// Every response failed its checksum
    #[error("Checksum failed after {attempts} attempts")]
    ChecksumExhausted { attempts: u32 },

    /// Read operation timed out
    #[error("Read timeout after {0}ms")]
    ReadTimeout(u64),

    /// Write operation timed out
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// ACS closed the connection while a response was expected
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Protocol-level error from the codec or a message builder
    #[error("Protocol error: {0}")]
    Protocol(#[from] sip2_core::Error),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub(crate) fn connection(host: &str, port: u16, reason: impl ToString) -> Self {
        Self::Connection {
            host: host.to_string(),
            port,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
