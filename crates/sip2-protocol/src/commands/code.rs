//! SIP2 command codes.
//!
//! Every message starts with a two digit code. Requests sent by the SC have
//! odd codes (plus `93`, `97` and `99` for the terminal level messages) and
//! the ACS answers with the code one above:
//!
//! ```text
//! 23 Patron Status Request   ->  24 Patron Status Response
//! 93 Login                   ->  94 Login Response
//! 99 SC Status               ->  98 ACS Status
//! ```
//!
//! # Examples
//!
//! ```
//! use sip2_protocol::CommandCode;
//!
//! let cmd = CommandCode::parse("63").unwrap();
//! assert_eq!(cmd, CommandCode::PatronInformation);
//! assert_eq!(cmd.response(), Some(CommandCode::PatronInformationResponse));
//! assert_eq!(CommandCode::AcsStatus.as_str(), "98");
//! ```

use serde::{Deserialize, Serialize};
use sip2_core::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandCode {
    // SC -> ACS
    BlockPatron,       // 01
    Checkin,           // 09
    Checkout,          // 11
    Hold,              // 15
    ItemInformation,   // 17
    ItemStatusUpdate,  // 19
    PatronStatus,      // 23
    PatronEnable,      // 25
    Renew,             // 29
    EndPatronSession,  // 35
    FeePaid,           // 37
    PatronInformation, // 63
    RenewAll,          // 65
    Login,             // 93
    RequestAcsResend,  // 97
    ScStatus,          // 99

    // ACS -> SC
    CheckinResponse,           // 10
    CheckoutResponse,          // 12
    HoldResponse,              // 16
    ItemInformationResponse,   // 18
    ItemStatusUpdateResponse,  // 20
    PatronStatusResponse,      // 24
    PatronEnableResponse,      // 26
    RenewResponse,             // 30
    EndSessionResponse,        // 36
    FeePaidResponse,           // 38
    PatronInformationResponse, // 64
    RenewAllResponse,          // 66
    LoginResponse,             // 94
    RequestScResend,           // 96
    AcsStatus,                 // 98
}

impl CommandCode {
    /// Parse a two character command code.
    ///
    /// # Errors
    /// Returns `Error::InvalidCommandCode` for unknown codes.
    pub fn parse(s: &str) -> Result<Self> {
        let code = match s {
            "01" => CommandCode::BlockPatron,
            "09" => CommandCode::Checkin,
            "11" => CommandCode::Checkout,
            "15" => CommandCode::Hold,
            "17" => CommandCode::ItemInformation,
            "19" => CommandCode::ItemStatusUpdate,
            "23" => CommandCode::PatronStatus,
            "25" => CommandCode::PatronEnable,
            "29" => CommandCode::Renew,
            "35" => CommandCode::EndPatronSession,
            "37" => CommandCode::FeePaid,
            "63" => CommandCode::PatronInformation,
            "65" => CommandCode::RenewAll,
            "93" => CommandCode::Login,
            "97" => CommandCode::RequestAcsResend,
            "99" => CommandCode::ScStatus,
            "10" => CommandCode::CheckinResponse,
            "12" => CommandCode::CheckoutResponse,
            "16" => CommandCode::HoldResponse,
            "18" => CommandCode::ItemInformationResponse,
            "20" => CommandCode::ItemStatusUpdateResponse,
            "24" => CommandCode::PatronStatusResponse,
            "26" => CommandCode::PatronEnableResponse,
            "30" => CommandCode::RenewResponse,
            "36" => CommandCode::EndSessionResponse,
            "38" => CommandCode::FeePaidResponse,
            "64" => CommandCode::PatronInformationResponse,
            "66" => CommandCode::RenewAllResponse,
            "94" => CommandCode::LoginResponse,
            "96" => CommandCode::RequestScResend,
            "98" => CommandCode::AcsStatus,
            _ => return Err(Error::InvalidCommandCode(s.to_string())),
        };
        Ok(code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandCode::BlockPatron => "01",
            CommandCode::Checkin => "09",
            CommandCode::Checkout => "11",
            CommandCode::Hold => "15",
            CommandCode::ItemInformation => "17",
            CommandCode::ItemStatusUpdate => "19",
            CommandCode::PatronStatus => "23",
            CommandCode::PatronEnable => "25",
            CommandCode::Renew => "29",
            CommandCode::EndPatronSession => "35",
            CommandCode::FeePaid => "37",
            CommandCode::PatronInformation => "63",
            CommandCode::RenewAll => "65",
            CommandCode::Login => "93",
            CommandCode::RequestAcsResend => "97",
            CommandCode::ScStatus => "99",
            CommandCode::CheckinResponse => "10",
            CommandCode::CheckoutResponse => "12",
            CommandCode::HoldResponse => "16",
            CommandCode::ItemInformationResponse => "18",
            CommandCode::ItemStatusUpdateResponse => "20",
            CommandCode::PatronStatusResponse => "24",
            CommandCode::PatronEnableResponse => "26",
            CommandCode::RenewResponse => "30",
            CommandCode::EndSessionResponse => "36",
            CommandCode::FeePaidResponse => "38",
            CommandCode::PatronInformationResponse => "64",
            CommandCode::RenewAllResponse => "66",
            CommandCode::LoginResponse => "94",
            CommandCode::RequestScResend => "96",
            CommandCode::AcsStatus => "98",
        }
    }

    /// Returns `true` for messages sent by the SC.
    #[inline]
    pub fn is_request(&self) -> bool {
        self.response().is_some() || *self == CommandCode::RequestAcsResend
    }

    /// The response code the ACS answers this request with.
    ///
    /// `None` for response codes and for `97`, which is answered by a repeat
    /// of whatever the ACS sent last.
    pub fn response(&self) -> Option<CommandCode> {
        let code = match self {
            CommandCode::BlockPatron | CommandCode::PatronStatus => {
                CommandCode::PatronStatusResponse
            }
            CommandCode::Checkin => CommandCode::CheckinResponse,
            CommandCode::Checkout => CommandCode::CheckoutResponse,
            CommandCode::Hold => CommandCode::HoldResponse,
            CommandCode::ItemInformation => CommandCode::ItemInformationResponse,
            CommandCode::ItemStatusUpdate => CommandCode::ItemStatusUpdateResponse,
            CommandCode::PatronEnable => CommandCode::PatronEnableResponse,
            CommandCode::Renew => CommandCode::RenewResponse,
            CommandCode::EndPatronSession => CommandCode::EndSessionResponse,
            CommandCode::FeePaid => CommandCode::FeePaidResponse,
            CommandCode::PatronInformation => CommandCode::PatronInformationResponse,
            CommandCode::RenewAll => CommandCode::RenewAllResponse,
            CommandCode::Login => CommandCode::LoginResponse,
            CommandCode::ScStatus => CommandCode::AcsStatus,
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
