//! SIP2 protocol engine: frame building, checksums, sequence numbers,
//! response decoding and the message types built on top of them.

pub mod builder;
pub mod checksum;
pub mod codec;
pub mod commands;
pub mod response;
pub mod sequence;

pub use builder::{BuildState, MessageBuilder};
pub use codec::SipCodec;
pub use commands::{CommandCode, Request, RequestContext};
pub use response::{FixedField, ParsedResponse, ResponseLayout, VariableFields, decode_variable};
pub use sequence::SequenceCounter;
