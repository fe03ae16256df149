//! Terminal level messages: login, SC status and resend.

use super::{CommandCode, Request, RequestContext};
use crate::{
    builder::MessageBuilder,
    response::{FixedField, ResponseLayout},
};
use sip2_core::{Result, SipTimestamp, constants::PROTOCOL_VERSION};

/// `94` Login Response
pub static LOGIN_RESPONSE: ResponseLayout =
    ResponseLayout::new("94", &[FixedField::new("Ok", 1)]);

/// `98` ACS Status
pub static ACS_STATUS_RESPONSE: ResponseLayout = ResponseLayout::new(
    "98",
    &[
        FixedField::new("OnlineStatus", 1),
        FixedField::new("CheckinOk", 1),
        FixedField::new("CheckoutOk", 1),
        FixedField::new("AcsRenewalPolicy", 1),
        FixedField::new("StatusUpdateOk", 1),
        FixedField::new("OfflineOk", 1),
        FixedField::new("TimeoutPeriod", 3),
        FixedField::new("RetriesAllowed", 3),
        FixedField::new("TransactionDate", 18),
        FixedField::new("ProtocolVersion", 4),
    ],
);

/// `93` Login
///
/// Logs the SC itself into the ACS; this is not a patron login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub user_id: String,
    pub password: String,
    /// `0` for plain text, other algorithms are vendor specific
    pub uid_algorithm: char,
    pub pwd_algorithm: char,
}

impl Login {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Login {
            user_id: user_id.into(),
            password: password.into(),
            uid_algorithm: '0',
            pwd_algorithm: '0',
        }
    }
}

impl Request for Login {
    fn code(&self) -> CommandCode {
        CommandCode::Login
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, _: &SipTimestamp) -> Result<()> {
        b.add_fixed(self.uid_algorithm.encode_utf8(&mut [0; 4]), 1);
        b.add_fixed(self.pwd_algorithm.encode_utf8(&mut [0; 4]), 1);
        b.add_variable("CN", &self.user_id, false);
        b.add_variable("CO", &self.password, false);
        b.add_variable("CP", &ctx.location, true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &LOGIN_RESPONSE
    }
}

/// Printer state reported with an SC status request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusCode {
    #[default]
    Ok,
    OutOfPaper,
    ShuttingDown,
}

impl StatusCode {
    fn as_str(self) -> &'static str {
        match self {
            StatusCode::Ok => "0",
            StatusCode::OutOfPaper => "1",
            StatusCode::ShuttingDown => "2",
        }
    }
}

/// `99` SC Status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScStatus {
    pub status: StatusCode,
    pub max_print_width: u16,
    pub protocol_version: String,
}

impl Default for ScStatus {
    fn default() -> Self {
        ScStatus {
            status: StatusCode::Ok,
            max_print_width: 80,
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }
}

impl Request for ScStatus {
    fn code(&self) -> CommandCode {
        CommandCode::ScStatus
    }

    fn write(&self, b: &mut MessageBuilder, _: &RequestContext, _: &SipTimestamp) -> Result<()> {
        b.add_fixed(self.status.as_str(), 1);
        b.add_fixed(&format!("{:03}", self.max_print_width), 3);
        b.add_fixed(&self.protocol_version, 4);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &ACS_STATUS_RESPONSE
    }
}

/// Build a `97` Request ACS Resend.
///
/// Never carries a sequence number; the checksum follows the builder's
/// options.
pub fn request_acs_resend(builder: &mut MessageBuilder) -> String {
    let with_checksum = builder.options().checksum;
    builder.reset(CommandCode::RequestAcsResend.as_str());
    builder.finish(false, with_checksum)
}
