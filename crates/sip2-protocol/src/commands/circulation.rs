//! Circulation messages: checkout, checkin, renewals, holds and item
//! information.

use super::{CommandCode, Request, RequestContext, add_date, yes_no};
use crate::{
    builder::MessageBuilder,
    response::{FixedField, ResponseLayout},
};
use sip2_core::{Error, Result, SipTimestamp, constants::TIMESTAMP_LENGTH};

const CIRCULATION_FIELDS: &[FixedField] = &[
    FixedField::new("Ok", 1),
    FixedField::new("RenewalOk", 1),
    FixedField::new("MagneticMedia", 1),
    FixedField::new("Desensitize", 1),
    FixedField::new("TransactionDate", 18),
];

/// `12` Checkout Response
pub static CHECKOUT_RESPONSE: ResponseLayout = ResponseLayout::new("12", CIRCULATION_FIELDS);

/// `30` Renew Response
pub static RENEW_RESPONSE: ResponseLayout = ResponseLayout::new("30", CIRCULATION_FIELDS);

/// `10` Checkin Response
pub static CHECKIN_RESPONSE: ResponseLayout = ResponseLayout::new(
    "10",
    &[
        FixedField::new("Ok", 1),
        FixedField::new("Resensitize", 1),
        FixedField::new("MagneticMedia", 1),
        FixedField::new("Alert", 1),
        FixedField::new("TransactionDate", 18),
    ],
);

/// `66` Renew All Response
pub static RENEW_ALL_RESPONSE: ResponseLayout = ResponseLayout::new(
    "66",
    &[
        FixedField::new("Ok", 1),
        FixedField::new("RenewedItems", 4),
        FixedField::new("UnrenewedItems", 4),
        FixedField::new("TransactionDate", 18),
    ],
);

/// `16` Hold Response
pub static HOLD_RESPONSE: ResponseLayout = ResponseLayout::new(
    "16",
    &[
        FixedField::new("Ok", 1),
        FixedField::new("Available", 1),
        FixedField::new("TransactionDate", 18),
        FixedField::new("ExpirationDate", 18),
    ],
);

/// `18` Item Information Response
pub static ITEM_INFORMATION_RESPONSE: ResponseLayout = ResponseLayout::new(
    "18",
    &[
        FixedField::new("CirculationStatus", 2),
        FixedField::new("SecurityMarker", 2),
        FixedField::new("FeeType", 2),
        FixedField::new("TransactionDate", 18),
    ],
);

/// `20` Item Status Update Response
pub static ITEM_STATUS_UPDATE_RESPONSE: ResponseLayout = ResponseLayout::new(
    "20",
    &[
        FixedField::new("ItemPropertiesOk", 1),
        FixedField::new("TransactionDate", 18),
    ],
);

/// `11` Checkout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkout {
    pub item_id: String,
    /// Due date override; blank lets the ACS compute it
    pub nb_due_date: Option<SipTimestamp>,
    pub sc_renewal_policy: bool,
    pub no_block: bool,
    pub item_properties: String,
    pub fee_acknowledged: bool,
    pub cancel: bool,
}

impl Checkout {
    pub fn new(item_id: impl Into<String>) -> Self {
        Checkout {
            item_id: item_id.into(),
            ..Self::default()
        }
    }
}

impl Request for Checkout {
    fn code(&self) -> CommandCode {
        CommandCode::Checkout
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        b.add_fixed(yes_no(self.sc_renewal_policy), 1);
        b.add_fixed(yes_no(self.no_block), 1);
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        add_date(b, self.nb_due_date.as_ref());
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AB", &self.item_id, false);
        b.add_variable("AC", &ctx.terminal_password, false);
        b.add_variable("CH", &self.item_properties, true);
        b.add_variable("AD", &ctx.patron_password, true);
        b.add_variable("BO", yes_no(self.fee_acknowledged), true);
        b.add_variable("BI", yes_no(self.cancel), true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &CHECKOUT_RESPONSE
    }
}

/// `09` Checkin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkin {
    pub item_id: String,
    /// Defaults to the transaction date
    pub return_date: Option<SipTimestamp>,
    /// Defaults to the SC location
    pub current_location: String,
    pub item_properties: String,
    pub no_block: bool,
    pub cancel: Option<bool>,
}

impl Checkin {
    pub fn new(item_id: impl Into<String>) -> Self {
        Checkin {
            item_id: item_id.into(),
            ..Self::default()
        }
    }
}

impl Request for Checkin {
    fn code(&self) -> CommandCode {
        CommandCode::Checkin
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        let location = if self.current_location.is_empty() {
            &ctx.location
        } else {
            &self.current_location
        };

        b.add_fixed(yes_no(self.no_block), 1);
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        add_date(b, Some(self.return_date.as_ref().unwrap_or(now)));
        b.add_variable("AP", location, false);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AB", &self.item_id, false);
        b.add_variable("AC", &ctx.terminal_password, false);
        b.add_variable("CH", &self.item_properties, true);
        b.add_variable("BI", self.cancel.map(yes_no).unwrap_or_default(), true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &CHECKIN_RESPONSE
    }
}

/// `29` Renew
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renew {
    pub item_id: String,
    pub title_id: String,
    pub nb_due_date: Option<SipTimestamp>,
    pub item_properties: String,
    pub third_party_allowed: bool,
    pub no_block: bool,
    pub fee_acknowledged: bool,
}

impl Renew {
    pub fn item(item_id: impl Into<String>) -> Self {
        Renew {
            item_id: item_id.into(),
            ..Self::default()
        }
    }
}

impl Request for Renew {
    fn code(&self) -> CommandCode {
        CommandCode::Renew
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        if self.item_id.is_empty() && self.title_id.is_empty() {
            return Err(Error::InvalidMessageFormat {
                message: "renew needs an item or a title identifier".to_string(),
            });
        }

        b.add_fixed(yes_no(self.third_party_allowed), 1);
        b.add_fixed(yes_no(self.no_block), 1);
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        add_date(b, self.nb_due_date.as_ref());
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AD", &ctx.patron_password, true);
        b.add_variable("AB", &self.item_id, true);
        b.add_variable("AJ", &self.title_id, true);
        b.add_variable("AC", &ctx.terminal_password, true);
        b.add_variable("CH", &self.item_properties, true);
        b.add_variable("BO", yes_no(self.fee_acknowledged), true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &RENEW_RESPONSE
    }
}

/// `65` Renew All
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenewAll {
    pub fee_acknowledged: bool,
}

impl Request for RenewAll {
    fn code(&self) -> CommandCode {
        CommandCode::RenewAll
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, _: &SipTimestamp) -> Result<()> {
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AD", &ctx.patron_password, true);
        b.add_variable("AC", &ctx.terminal_password, true);
        b.add_variable("BO", yes_no(self.fee_acknowledged), true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &RENEW_ALL_RESPONSE
    }
}

/// `17` Item Information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemInformation {
    pub item_id: String,
}

impl ItemInformation {
    pub fn new(item_id: impl Into<String>) -> Self {
        ItemInformation {
            item_id: item_id.into(),
        }
    }
}

impl Request for ItemInformation {
    fn code(&self) -> CommandCode {
        CommandCode::ItemInformation
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AB", &self.item_id, false);
        b.add_variable("AC", &ctx.terminal_password, true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &ITEM_INFORMATION_RESPONSE
    }
}

/// `19` Item Status Update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemStatusUpdate {
    pub item_id: String,
    pub item_properties: String,
}

impl Request for ItemStatusUpdate {
    fn code(&self) -> CommandCode {
        CommandCode::ItemStatusUpdate
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AB", &self.item_id, false);
        b.add_variable("AC", &ctx.terminal_password, true);
        b.add_variable("CH", &self.item_properties, false);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &ITEM_STATUS_UPDATE_RESPONSE
    }
}

/// Hold operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HoldMode {
    #[default]
    Add,
    Delete,
    Change,
}

impl HoldMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HoldMode::Add => "+",
            HoldMode::Delete => "-",
            HoldMode::Change => "*",
        }
    }
}

/// `15` Hold
///
/// The ACS needs an item identifier, a title identifier or both to act on
/// the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hold {
    pub mode: HoldMode,
    pub expiration_date: Option<SipTimestamp>,
    pub pickup_location: String,
    /// 1 other, 2 any copy of title, 3 specific copy, 4 any copy at location
    pub hold_type: Option<u8>,
    pub item_id: String,
    pub title_id: String,
    pub fee_acknowledged: bool,
}

impl Request for Hold {
    fn code(&self) -> CommandCode {
        CommandCode::Hold
    }

    fn write(&self, b: &mut MessageBuilder, ctx: &RequestContext, now: &SipTimestamp) -> Result<()> {
        let hold_type = match self.hold_type {
            Some(t @ 1..=9) => t.to_string(),
            Some(t) => {
                return Err(Error::InvalidMessageFormat {
                    message: format!("invalid hold type {t}"),
                });
            }
            None => String::new(),
        };
        let expiration = self
            .expiration_date
            .as_ref()
            .map(SipTimestamp::format)
            .unwrap_or_default();

        b.add_fixed(self.mode.as_str(), 1);
        b.add_fixed(&now.format(), TIMESTAMP_LENGTH);
        // Expiration date behaves like an optional variable field on real ACS
        b.add_variable("BW", &expiration, true);
        b.add_variable("BS", &self.pickup_location, true);
        b.add_variable("BY", &hold_type, true);
        b.add_variable("AO", &ctx.institution_id, false);
        b.add_variable("AA", &ctx.patron, false);
        b.add_variable("AD", &ctx.patron_password, true);
        b.add_variable("AB", &self.item_id, true);
        b.add_variable("AJ", &self.title_id, true);
        b.add_variable("AC", &ctx.terminal_password, true);
        b.add_variable("BO", yes_no(self.fee_acknowledged), true);
        Ok(())
    }

    fn response_layout(&self) -> &'static ResponseLayout {
        &HOLD_RESPONSE
    }
}
