//! Patron messages.

use super::{CommandCode, Request, RequestContext, yes_no};
use crate::{
    builder::MessageBuilder,
    response::{FixedField, ResponseLayout},
};
use sip2_core::{Error, Result, SipTimestamp, constants::TIMESTAMP_LENGTH};

const PATRON_STATUS_FIELDS: &[FixedField] = &[
    FixedField::new("PatronStatus", 14),
    FixedField::new("Language", 3),
    FixedField::new("TransactionDate", 18),
];

/// `24` Patron Status Response, also the answer to Block Patron
pub static PATRON_STATUS_RESPONSE: ResponseLayout =
    ResponseLayout::new("24", PATRON_STATUS_FIELDS);

/// `26` Patron Enable Response
pub static PATRON_ENABLE_RESPONSE: ResponseLayout =
    ResponseLayout::new("26", PATRON_STATUS_FIELDS);

/// `64` Patron Information Response
pub static PATRON_INFORMATION_RESPONSE: ResponseLayout = ResponseLayout::new(
    "64",
    &[
        FixedField::new("PatronStatus", 14),
        FixedField::new("Language", 3),
        FixedField::new("TransactionDate", 18),
        FixedField::new("HoldItemsCount", 4),
        FixedField::new("OverdueItemsCount", 4),
        FixedField::new("ChargedItemsCount", 4),
        FixedField::new("FineItemsCount", 4),
        FixedField::new("RecallItemsCount", 4),
        FixedField::new("UnavailableHoldsCount", 4),
    ],
);

/// `36` End Session Response
pub static END_SESSION_RESPONSE: ResponseLayout = ResponseLayout::new(
    "36",
    &[
        FixedField::new("EndSession", 1),
        FixedField::new("TransactionDate", 18),
    ],
);

/// `38` Fee Paid Response
pub static FEE_PAID_RESPONSE: ResponseLayout = ResponseLayout::new(
    "38",
    &[
        FixedField::new("PaymentAccepted", 1),
        FixedField::new("TransactionDate", 18),
    ],
);

/// `23` Patron Status Request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatronStatus;

impl Request for PatronStatus {
    fn code(&self) -> CommandCode {
        CommandCode::PatronStatus
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        b.add_fixed(&ctx.language, 3);
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AC", &ctx.terminal_password, false);
        b.add_variable("AD", &ctx.patron_password, false);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &PATRON_STATUS_RESPONSE
    }
}

/// Item list requested with patron information.
///
/// At most one list is returned per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Summary {
    #[default]
    None,
    Hold,
    Overdue,
    Charged,
    Fine,
    Recall,
    Unavailable,
    FeeItems,
}

impl Summary {
    /// The ten character summary field with a `Y` at the list's position.
    pub fn field(self) -> String {
        let position = match self {
            Summary::None => return " ".repeat(10),
            Summary::Hold => 0,
            Summary::Overdue => 1,
            Summary::Charged => 2,
            Summary::Fine => 3,
            Summary::Recall => 4,
            Summary::Unavailable => 5,
            Summary::FeeItems => 6,
        };
        (0..10)
            .map(|i| if i == position { 'Y' } else { ' ' })
            .collect()
    }
}

/// `63` Patron Information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatronInformation {
    pub summary: Summary,
    pub start_item: u32,
    pub end_item: u32,
}

impl PatronInformation {
    pub fn new(summary: Summary) -> Self {
        PatronInformation {
            summary,
            start_item: 1,
            end_item: 5,
        }
    }
}

impl Default for PatronInformation {
    fn default() -> Self {
        Self::new(Summary::None)
    }
}

impl Request for PatronInformation {
    fn code(&self) -> CommandCode {
        CommandCode::PatronInformation
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        if self.start_item > self.end_item {
            return Err(Error::InvalidMessageFormat {
                message: format!(
                    "start item {} is after end item {}",
                    self.start_item, self.end_item
                ),
            });
        }

        b.add_fixed(&ctx.language, 3);
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        b.add_fixed(&self.summary.field(), 10);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AC", &ctx.terminal_password, true);
        b.add_variable("AD", &ctx.patron_password, true);
        b.add_variable("BP", &self.start_item.to_string(), true);
        b.add_variable("BQ", &self.end_item.to_string(), true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &PATRON_INFORMATION_RESPONSE
    }
}

/// `25` Patron Enable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatronEnable;

impl Request for PatronEnable {
    fn code(&self) -> CommandCode {
        CommandCode::PatronEnable
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AC", &ctx.terminal_password, true);
        b.add_variable("AD", &ctx.patron_password, true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &PATRON_ENABLE_RESPONSE
    }
}

/// `35` End Patron Session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndPatronSession;

impl Request for EndPatronSession {
    fn code(&self) -> CommandCode {
        CommandCode::EndPatronSession
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AC", &ctx.terminal_password, true);
        b.add_variable("AD", &ctx.patron_password, true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &END_SESSION_RESPONSE
    }
}

/// `01` Block Patron
///
/// Sent when the SC detects tampering or a retained card. The ACS answers
/// with a patron status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPatron {
    pub card_retained: bool,
    pub message: String,
}

impl BlockPatron {
    pub fn new(message: impl Into<String>) -> Self {
        BlockPatron {
            card_retained: false,
            message: message.into(),
        }
    }
}

impl Request for BlockPatron {
    fn code(&self) -> CommandCode {
        CommandCode::BlockPatron
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        b.add_fixed(yes_no(self.card_retained), 1);
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AL", &self.message, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AC", &ctx.terminal_password, false);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &PATRON_STATUS_RESPONSE
    }
}

/// `37` Fee Paid
///
/// The amount is sent as given; formatting it for the ACS locale is up to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePaid {
    /// 01 other/unknown, 02 administrative, 03 damage, 04 overdue, ...
    pub fee_type: u8,
    /// 00 cash, 01 VISA, 02 credit card
    pub payment_type: u8,
    pub currency: String,
    pub amount: String,
    pub fee_id: String,
    pub transaction_id: String,
}

impl FeePaid {
    pub fn new(fee_type: u8, payment_type: u8, amount: impl Into<String>) -> Self {
        FeePaid {
            fee_type,
            payment_type,
            currency: "EUR".to_string(),
            amount: amount.into(),
            fee_id: String::new(),
            transaction_id: String::new(),
        }
    }
}

impl Request for FeePaid {
    fn code(&self) -> CommandCode {
        CommandCode::FeePaid
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        if !(1..=99).contains(&self.fee_type) {
            return Err(Error::InvalidMessageFormat {
                message: format!("invalid fee type {}", self.fee_type),
            });
        }
        if self.payment_type > 99 {
            return Err(Error::InvalidMessageFormat {
                message: format!("invalid payment type {}", self.payment_type),
            });
        }

        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        b.add_fixed(&format!("{:02}", self.fee_type), 2);
        b.add_fixed(&format!("{:02}", self.payment_type), 2);
        b.add_fixed(&self.currency, 3);
        b.add_variable("BV", &self.amount, false);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AC", &ctx.terminal_password, true);
        b.add_variable("AD", &ctx.patron_password, true);
        b.add_variable("CG", &self.fee_id, true);
        b.add_variable("BK", &self.transaction_id, true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &FEE_PAID_RESPONSE
    }
}
