pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{FrameOptions, Sip2Config, TlsConfig};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
