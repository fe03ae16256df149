//! Core constants for the SIP2 protocol implementation.
//!
//! This module defines the protocol-level constants shared by the message
//! builder, the response decoder and the network client. Keeping them in one
//! place guarantees that both directions of the conversation agree on the
//! frame layout.
//!
//! # Protocol Structure
//!
//! Every SIP2 frame has the same shape:
//!
//! ```text
//! CC<fixed fields><TAGvalue|>...[AY<seq>][AZ<checksum>]<CR>
//! ```
//!
//! Where:
//! - `CC` - Two character command code (`93` login, `99` SC status, ...)
//! - `<fixed fields>` - Fixed width values, space padded, no delimiters
//! - `TAGvalue|` - Variable fields: 2 character tag, value, field terminator
//! - `AY<seq>` - Optional sequence number (single digit 0-9)
//! - `AZ<checksum>` - Optional checksum (4 hex digits)
//! - `<CR>` - Message terminator
//!
//! # Usage
//!
//! ```
//! use sip2_core::constants::*;
//!
//! assert_eq!(TAG_CHECKSUM, "AZ");
//! assert_eq!(CHECKSUM_LENGTH, 4);
//!
//! let frame = format!("9300CNuser{}COpass{}", FIELD_TERMINATOR, FIELD_TERMINATOR);
//! assert_eq!(frame.split(FIELD_TERMINATOR).count(), 3);
//! ```

// ============================================================================
// Terminators
// ============================================================================

/// Default field terminator closing every variable length field.
///
/// # Examples
///
/// ```
/// use sip2_core::constants::FIELD_TERMINATOR;
///
/// let data = "AOInstitute|AApatron|";
/// let fields: Vec<&str> = data.split(FIELD_TERMINATOR).collect();
/// assert_eq!(fields, vec!["AOInstitute", "AApatron", ""]);
/// ```
pub const FIELD_TERMINATOR: char = '|';

/// Default message terminator (carriage return, 0x0D).
pub const MESSAGE_TERMINATOR: char = '\r';

// ============================================================================
// Frame Structure Components
// ============================================================================

/// Length of the command code that opens every frame.
pub const COMMAND_CODE_LENGTH: usize = 2;

/// Length of a variable field tag (`AO`, `AA`, `AZ`, ...).
pub const TAG_LENGTH: usize = 2;

/// Tag of the sequence number field.
///
/// ```text
/// 9300CNuser|COpass|AY0AZF83E
///                   ^^
///                   Sequence tag
/// ```
pub const TAG_SEQUENCE: &str = "AY";

/// Tag of the checksum field.
///
/// The checksum covers every character of the frame up to and including
/// this tag.
pub const TAG_CHECKSUM: &str = "AZ";

/// Number of hex digits in a well formed checksum.
pub const CHECKSUM_LENGTH: usize = 4;

/// Highest sequence number before the counter wraps back to 0.
pub const MAX_SEQUENCE: u8 = 9;

/// Maximum number of characters kept from a variable field value.
///
/// Longer values are truncated silently by the message builder. This is the
/// protocol's own field width cap, not a validation failure.
///
/// # Examples
///
/// ```
/// use sip2_core::constants::MAX_VARIABLE_FIELD_LENGTH;
///
/// let long = "x".repeat(300);
/// let kept: String = long.chars().take(MAX_VARIABLE_FIELD_LENGTH).collect();
/// assert_eq!(kept.len(), 255);
/// ```
pub const MAX_VARIABLE_FIELD_LENGTH: usize = 255;

/// Width of a SIP2 date/time stamp (`YYYYMMDDZZZZHHMMSS`).
pub const TIMESTAMP_LENGTH: usize = 18;

/// `chrono` format string producing a local time SIP2 timestamp.
///
/// The four `ZZZZ` timezone characters are blanks, which the protocol
/// defines as "local time".
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d    %H%M%S";

/// Protocol version announced in SC status requests.
pub const PROTOCOL_VERSION: &str = "2.00";

// ============================================================================
// Connection Defaults
// ============================================================================

/// Default ACS port.
pub const DEFAULT_PORT: u16 = 1294;

/// Default timeout for connect, handshake, read and write (milliseconds).
///
/// # Value: 3000ms (3 seconds)
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 3000;

/// Default number of resends after a response fails its checksum.
///
/// Zero means any checksum failure is immediately fatal.
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Default maximum size of one response frame in bytes (64 KB).
///
/// A SIP2 response longer than this is treated as a protocol violation
/// rather than buffered without bound.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;
