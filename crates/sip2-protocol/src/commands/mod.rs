//! SIP2 message types.
//!
//! Each request is a plain struct implementing [`Request`]: it knows its
//! command code, writes its fixed and variable fields through a
//! [`MessageBuilder`], and names the [`ResponseLayout`] of the answer. Values
//! shared by most messages (institution, terminal password, patron
//! credentials) come from a [`RequestContext`].
//!
//! # Examples
//!
//! ```
//! use sip2_core::{FrameOptions, SipTimestamp};
//! use sip2_protocol::MessageBuilder;
//! use sip2_protocol::commands::{self, Login, RequestContext};
//!
//! let mut builder = MessageBuilder::new(FrameOptions::default());
//! let ctx = RequestContext::default();
//! let now = SipTimestamp::now();
//!
//! let frame = commands::build_at(&Login::new("user", "pass"), &mut builder, &ctx, &now).unwrap();
//! assert_eq!(frame, "9300CNuser|COpass|AY0AZF83E\r");
//! ```

pub mod circulation;
pub mod code;
pub mod patron;
pub mod status;

pub use circulation::{
    CHECKIN_RESPONSE, CHECKOUT_RESPONSE, Checkin, Checkout, HOLD_RESPONSE, Hold, HoldMode,
    ITEM_INFORMATION_RESPONSE, ITEM_STATUS_UPDATE_RESPONSE, ItemInformation, ItemStatusUpdate,
    RENEW_ALL_RESPONSE, RENEW_RESPONSE, Renew, RenewAll,
};
pub use code::CommandCode;
pub use patron::{
    BlockPatron, END_SESSION_RESPONSE, EndPatronSession, FEE_PAID_RESPONSE, FeePaid,
    PATRON_ENABLE_RESPONSE, PATRON_INFORMATION_RESPONSE, PATRON_STATUS_RESPONSE, PatronEnable,
    PatronInformation, PatronStatus, Summary,
};
pub use status::{
    ACS_STATUS_RESPONSE, LOGIN_RESPONSE, Login, ScStatus, StatusCode, request_acs_resend,
};

use crate::{builder::MessageBuilder, response::ResponseLayout};
use serde::{Deserialize, Serialize};
use sip2_core::{Result, SipTimestamp, constants::TIMESTAMP_LENGTH};

/// Terminal and patron values shared by most requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestContext {
    /// `AO` field
    pub institution_id: String,

    /// `AC` field
    pub terminal_password: String,

    /// SC location, sent as `CP` on login and `AP` on checkin
    pub location: String,

    /// Three digit language code (`000` unknown, `001` English)
    pub language: String,

    /// `AA` field
    pub patron: String,

    /// `AD` field
    pub patron_password: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            institution_id: String::new(),
            terminal_password: String::new(),
            location: String::new(),
            language: "000".to_string(),
            patron: String::new(),
            patron_password: String::new(),
        }
    }
}

impl RequestContext {
    pub fn new(institution_id: impl Into<String>) -> Self {
        Self {
            institution_id: institution_id.into(),
            ..Self::default()
        }
    }

    /// Set the patron credentials used by patron and circulation requests.
    pub fn set_patron(&mut self, patron: impl Into<String>, password: impl Into<String>) {
        self.patron = patron.into();
        self.patron_password = password.into();
    }

    pub fn clear_patron(&mut self) {
        self.patron.clear();
        self.patron_password.clear();
    }
}

/// A request message.
pub trait Request {
    /// Command code the message starts with.
    fn code(&self) -> CommandCode;

    /// Append the fixed and variable fields.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` for argument values that the
    /// message cannot carry.
    fn write(
        &self,
        builder: &mut MessageBuilder,
        ctx: &RequestContext,
        now: &SipTimestamp,
    ) -> Result<()>;

    /// Layout of the ACS answer.
    fn response_layout(&self) -> &'static ResponseLayout;
}

/// Build a complete frame for `request`, stamped with the current time.
///
/// # Errors
/// Propagates argument errors from [`Request::write`].
pub fn build<R: Request + ?Sized>(
    request: &R,
    builder: &mut MessageBuilder,
    ctx: &RequestContext,
) -> Result<String> {
    build_at(request, builder, ctx, &SipTimestamp::now())
}

/// Build a complete frame for `request` with an explicit transaction date.
///
/// # Errors
/// Propagates argument errors from [`Request::write`].
pub fn build_at<R: Request + ?Sized>(
    request: &R,
    builder: &mut MessageBuilder,
    ctx: &RequestContext,
    now: &SipTimestamp,
) -> Result<String> {
    builder.reset(request.code().as_str());
    request.write(builder, ctx, now)?;
    Ok(builder.finish_default())
}

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag { "Y" } else { "N" }
}

/// Fixed date field: the timestamp, or blanks when absent.
pub(crate) fn add_date(builder: &mut MessageBuilder, date: Option<&SipTimestamp>) {
    let value = date.map(SipTimestamp::format).unwrap_or_default();
    builder.add_fixed(&value, TIMESTAMP_LENGTH);
}
