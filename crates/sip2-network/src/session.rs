//! Terminal and patron session tracking on top of [`Sip2Client`].
//!
//! A [`Session`] logs the SC in, remembers the ACS status it reported, and
//! keeps at most one patron session open. Requests the ACS does not list as
//! supported are refused locally without touching the network.

use crate::client::Sip2Client;
use crate::error::ClientError;
use sip2_protocol::commands::{
    EndPatronSession, Login, PatronInformation, PatronStatus, ScStatus, Summary,
};
use sip2_protocol::{CommandCode, ParsedResponse, Request};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("ACS rejected the SC login")]
    LoginFailed,

    #[error("ACS is offline")]
    AcsOffline,

    #[error("No patron session active")]
    NoPatronSession,

    #[error("ACS did not end the patron session")]
    EndSessionRejected,

    #[error("Invalid fee amount {0:?}")]
    InvalidAmount(String),

    /// The ACS status does not list the command as supported
    #[error("ACS does not support {0} messages")]
    Unsupported(CommandCode),

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Position of each request in the ACS status `BX` field.
fn supported_message_index(code: CommandCode) -> Option<usize> {
    let index = match code {
        CommandCode::PatronStatus => 0,
        CommandCode::Checkout => 1,
        CommandCode::Checkin => 2,
        CommandCode::BlockPatron => 3,
        CommandCode::ScStatus => 4,
        CommandCode::RequestAcsResend => 5,
        CommandCode::Login => 6,
        CommandCode::PatronInformation => 7,
        CommandCode::EndPatronSession => 8,
        CommandCode::FeePaid => 9,
        CommandCode::ItemInformation => 10,
        CommandCode::ItemStatusUpdate => 11,
        CommandCode::PatronEnable => 12,
        CommandCode::Hold => 13,
        CommandCode::Renew => 14,
        CommandCode::RenewAll => 15,
        _ => return None,
    };
    Some(index)
}

/// Fee item tags of the Gossip patron information extension.
const FEE_ITEM_TAGS: [&str; 7] = ["CG", "FA", "FB", "FC", "FD", "FE", "FF"];

/// Variable field carrying the item list of a patron information summary.
fn summary_tag(summary: Summary) -> Option<&'static str> {
    match summary {
        Summary::None => None,
        Summary::Hold => Some("AS"),
        Summary::Overdue => Some("AT"),
        Summary::Charged => Some("AU"),
        Summary::Fine => Some("AV"),
        Summary::Recall => Some("BU"),
        Summary::Unavailable => Some("CD"),
        Summary::FeeItems => Some("CG"),
    }
}

pub struct Session {
    client: Sip2Client,
    acs_status: Option<ParsedResponse>,
    patron_status: Option<ParsedResponse>,
    in_patron_session: bool,
}

impl Session {
    pub fn new(client: Sip2Client) -> Self {
        Self {
            client,
            acs_status: None,
            patron_status: None,
            in_patron_session: false,
        }
    }

    pub fn client(&self) -> &Sip2Client {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut Sip2Client {
        &mut self.client
    }

    pub fn into_client(self) -> Sip2Client {
        self.client
    }

    /// Log the SC in and, with `self_check`, confirm the ACS is online.
    ///
    /// # Errors
    ///
    /// `LoginFailed` when the login response is not `1`, `AcsOffline` when
    /// the self check reports the ACS offline.
    pub async fn login_device(
        &mut self,
        user_id: &str,
        password: &str,
        self_check: bool,
    ) -> SessionResult<()> {
        let response = self.client.request(&Login::new(user_id, password)).await?;
        if response.flag("Ok") != Some(true) {
            warn!(user_id, "SC login rejected");
            return Err(SessionError::LoginFailed);
        }
        info!(user_id, "SC logged in");

        if self_check {
            let status = self.sc_status().await?;
            if status.flag("OnlineStatus") != Some(true) {
                warn!("ACS reports offline");
                return Err(SessionError::AcsOffline);
            }
        }
        Ok(())
    }

    /// Send an SC status message and remember the ACS answer.
    ///
    /// # Errors
    ///
    /// Transport errors from the client.
    pub async fn sc_status(&mut self) -> SessionResult<&ParsedResponse> {
        let status = self.client.request(&ScStatus::default()).await?;
        debug!(supported = ?status.first("BX"), "ACS status received");
        Ok(&*self.acs_status.insert(status))
    }

    /// Last ACS status, if a self check was made.
    pub fn acs_status(&self) -> Option<&ParsedResponse> {
        self.acs_status.as_ref()
    }

    /// Whether the ACS accepts `code`.
    ///
    /// Without a stored ACS status every command is assumed supported.
    pub fn supports(&self, code: CommandCode) -> bool {
        let Some(supported) = self.acs_status.as_ref().and_then(|s| s.first("BX")) else {
            return true;
        };
        supported_message_index(code)
            .and_then(|i| supported.chars().nth(i))
            .is_none_or(|flag| flag == 'Y')
    }

    /// Run `request` if the ACS supports it.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the ACS status rules the command out, otherwise
    /// errors from [`Sip2Client::request`].
    pub async fn request<R: Request + ?Sized>(
        &mut self,
        request: &R,
    ) -> SessionResult<ParsedResponse> {
        let code = request.code();
        if !self.supports(code) {
            warn!(%code, "Command not supported by ACS, not sent");
            return Err(SessionError::Unsupported(code));
        }
        Ok(self.client.request(request).await?)
    }

    /// Start a patron session, ending any previous one.
    ///
    /// Returns whether the patron is valid: `BL` must be `Y`, and when a
    /// password was given `CQ` must be `Y` as well.
    ///
    /// # Errors
    ///
    /// Transport errors, or a rejected end of the previous session.
    pub async fn login_patron(&mut self, patron: &str, password: &str) -> SessionResult<bool> {
        self.patron_status = None;
        if self.in_patron_session {
            self.end_patron_session().await?;
        }

        self.client.context_mut().set_patron(patron, password);
        let status = self.request(&PatronStatus).await?;

        let valid = status.first("BL") == Some("Y")
            && (password.is_empty() || status.first("CQ") == Some("Y"));
        debug!(patron, valid, "Patron status received");

        self.patron_status = Some(status);
        self.in_patron_session = valid;
        Ok(valid)
    }

    pub fn in_patron_session(&self) -> bool {
        self.in_patron_session
    }

    /// Patron status from the last patron login.
    pub fn patron_status(&self) -> Option<&ParsedResponse> {
        self.patron_status.as_ref()
    }

    /// Fetch patron information with the item list selected by `summary`.
    ///
    /// # Errors
    ///
    /// `NoPatronSession` outside a patron session.
    pub async fn patron_information(&mut self, summary: Summary) -> SessionResult<ParsedResponse> {
        if !self.in_patron_session {
            return Err(SessionError::NoPatronSession);
        }
        self.request(&PatronInformation::new(summary)).await
    }

    /// Item identifiers of one patron information list.
    ///
    /// # Errors
    ///
    /// As for [`patron_information`](Self::patron_information).
    pub async fn patron_items(&mut self, summary: Summary) -> SessionResult<Vec<String>> {
        let info = self.patron_information(summary).await?;
        Ok(summary_tag(summary)
            .map(|tag| info.all(tag).to_vec())
            .unwrap_or_default())
    }

    /// Total fines of the patron (`BV`), zero when the ACS reports none.
    ///
    /// # Errors
    ///
    /// `NoPatronSession` outside a patron session, `InvalidAmount` when `BV`
    /// is not a number.
    pub async fn patron_fines_total(&mut self) -> SessionResult<f64> {
        let info = self.patron_information(Summary::None).await?;
        match info.first("BV") {
            None => Ok(0.0),
            Some(amount) => amount
                .trim()
                .parse()
                .map_err(|_| SessionError::InvalidAmount(amount.to_string())),
        }
    }

    /// Fee items by tag (`CG` and `FA` to `FF`).
    ///
    /// Only Gossip servers send the breakdown; the map is empty when the
    /// response carries no `FA` field.
    ///
    /// # Errors
    ///
    /// As for [`patron_information`](Self::patron_information).
    pub async fn patron_fee_items(
        &mut self,
    ) -> SessionResult<BTreeMap<&'static str, Vec<String>>> {
        let info = self.patron_information(Summary::FeeItems).await?;
        if !info.variable.contains("FA") {
            return Ok(BTreeMap::new());
        }
        Ok(FEE_ITEM_TAGS
            .into_iter()
            .filter_map(|tag| info.variable.get(tag).map(|values| (tag, values.to_vec())))
            .collect())
    }

    /// Screen messages (`AF`) of the last patron status, one per line.
    pub fn patron_screen_messages(&self) -> &[String] {
        self.patron_status
            .as_ref()
            .map(|status| status.all("AF"))
            .unwrap_or_default()
    }

    /// End the patron session and forget the patron.
    ///
    /// # Errors
    ///
    /// `EndSessionRejected` when the ACS does not confirm the end.
    pub async fn end_patron_session(&mut self) -> SessionResult<()> {
        let response = self.client.request(&EndPatronSession).await?;
        if response.flag("EndSession") != Some(true) {
            return Err(SessionError::EndSessionRejected);
        }

        self.in_patron_session = false;
        self.patron_status = None;
        self.client.context_mut().clear_patron();
        debug!("Patron session ended");
        Ok(())
    }
}
