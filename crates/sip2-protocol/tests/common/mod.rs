//! Common test utilities for the protocol integration tests.
//!
//! Helpers come in two groups: request side (`context`, `build_frame`) for
//! frames an SC would send, and ACS side (`acs_frame`) for responses with a
//! correct sequence and checksum suffix.

#![allow(dead_code)]

use sip2_core::{FrameOptions, SipTimestamp};
use sip2_protocol::{MessageBuilder, Request, RequestContext, checksum, commands};

pub const TEST_DATE: &str = "20160419    122008";
pub const TEST_INSTITUTION: &str = "TUB";
pub const TEST_PATRON: &str = "X00000000";

pub fn timestamp() -> SipTimestamp {
    SipTimestamp::parse(TEST_DATE).expect("Test helper: invalid timestamp constant")
}

/// Context of a logged in terminal serving one patron.
pub fn context() -> RequestContext {
    let mut ctx = RequestContext::new(TEST_INSTITUTION);
    ctx.terminal_password = "term".to_string();
    ctx.location = "Lobby".to_string();
    ctx.set_patron(TEST_PATRON, "1234");
    ctx
}

/// Build `request` with default framing and the fixed test timestamp.
pub fn build_frame<R: Request>(builder: &mut MessageBuilder, request: &R) -> String {
    commands::build_at(request, builder, &context(), &timestamp())
        .expect("Test helper: failed to build request")
}

/// Append `AY<seq>AZ<checksum>` and a carriage return to an ACS response
/// body.
///
/// # Panics
///
/// Panics if `seq` is not a single digit.
pub fn acs_frame(body: &str, seq: u8) -> String {
    assert!(seq <= 9, "Test helper: sequence must be a digit");
    let mut frame = format!("{body}AY{seq}AZ");
    let crc = checksum::compute(&frame);
    frame.push_str(&crc);
    frame.push('\r');
    frame
}

/// Assert that a request frame carries the expected code, sequence digit
/// and a valid checksum.
pub fn assert_request_framing(frame: &str, code: &str, seq: u8) {
    assert!(frame.starts_with(code), "frame {frame:?} should start with {code}");
    assert!(frame.ends_with('\r'), "frame {frame:?} should end with CR");
    assert!(checksum::verify(frame), "frame {frame:?} has a bad checksum");

    let trimmed = frame.trim_end();
    let suffix = &trimmed[trimmed.len() - 9..];
    assert_eq!(&suffix[..2], "AY", "frame {frame:?} has no sequence field");
    assert_eq!(&suffix[2..3], seq.to_string(), "unexpected sequence in {frame:?}");
    assert_eq!(&suffix[3..5], "AZ", "frame {frame:?} has no checksum field");
}

pub fn default_builder() -> MessageBuilder {
    MessageBuilder::new(FrameOptions::default())
}
