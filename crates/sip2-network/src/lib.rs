//! Network layer for SIP2 clients.
//!
//! This crate connects to an ACS over plain TCP or TLS and runs SIP2
//! transactions over the connection, using the `SipCodec` from
//! `sip2-protocol` for framing.
//!
//! # Components
//!
//! - **ConnectionManager**: socket setup and TLS negotiation
//! - **Sip2Client**: request/response transactions with checksum resends
//! - **Session**: SC login and patron session tracking
//!
//! # Example
//!
//! ```no_run
//! use sip2_core::Sip2Config;
//! use sip2_network::{Session, Sip2Client};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = Sip2Client::new(Sip2Config::new("acs.example.org", 6001));
//! client.context_mut().institution_id = "830".to_string();
//! client.connect().await?;
//!
//! let mut session = Session::new(client);
//! session.login_device("sc01", "secret", true).await?;
//! if session.login_patron("P123", "1234").await? {
//!     session.end_patron_session().await?;
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod connection;
mod error;
mod session;
mod tls;
mod transport;

pub use client::Sip2Client;
pub use connection::ConnectionManager;
pub use error::{ClientError, Result};
pub use session::{Session, SessionError, SessionResult};
pub use transport::{ConnectionMode, Transport};
