//! SIP2 frame checksum.
//!
//! The checksum is the two's complement of the 16 bit sum of every character
//! in the frame, from the first character of the command code up to and
//! including the `AZ` tag. It is written as four uppercase hex digits.
//!
//! ```text
//! 941AY1AZFDFC
//! ^^^^^^^^      summed characters
//!         ^^^^  checksum
//! ```
//!
//! A receiver verifies a frame by recomputing the checksum over everything
//! that precedes the last four characters and comparing the two strings.
//!
//! # Examples
//!
//! ```
//! use sip2_protocol::checksum;
//!
//! assert_eq!(checksum::compute("941AY1AZ"), "FDFC");
//! assert!(checksum::verify("941AY1AZFDFC\r"));
//! assert!(!checksum::verify("941AY1AZFDFD\r"));
//! ```

use sip2_core::{FrameOptions, constants::CHECKSUM_LENGTH};

/// Compute the checksum of `text`.
///
/// Characters are summed by Unicode code point, so a frame decoded from the
/// wire checks out the same way regardless of the transport encoding. The
/// result is always four digits, zero-padded, to fill the `AZ` field.
#[must_use]
pub fn compute(text: &str) -> String {
    let sum = text
        .chars()
        .fold(0u32, |acc, c| acc.wrapping_add(u32::from(c)));
    let checksum = sum.wrapping_neg() & 0xFFFF;
    format!("{:0width$X}", checksum, width = CHECKSUM_LENGTH)
}

/// Split a frame into the checksummed body and the received checksum.
///
/// Trailing whitespace and terminators are ignored. Returns `None` when the
/// frame is shorter than a checksum.
#[must_use]
pub fn split(frame: &str) -> Option<(&str, &str)> {
    let trimmed = trim_frame(frame);
    let (idx, _) = trimmed.char_indices().rev().nth(CHECKSUM_LENGTH - 1)?;
    Some(trimmed.split_at(idx))
}

/// Verify the trailing checksum of a received frame.
#[must_use]
pub fn verify(frame: &str) -> bool {
    match split(frame) {
        Some((body, received)) => compute(body) == received,
        None => false,
    }
}

/// Verify a frame, treating every frame as valid when checksums are
/// disabled.
#[must_use]
pub fn verify_with(frame: &str, options: &FrameOptions) -> bool {
    !options.checksum || verify(frame)
}

/// Strip trailing whitespace and line terminators from a frame.
pub(crate) fn trim_frame(frame: &str) -> &str {
    frame.trim_end_matches(|c: char| c.is_whitespace() || c == '\0')
}
