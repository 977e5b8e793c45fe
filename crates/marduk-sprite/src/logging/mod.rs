//! Logging utilities.
//!
//! Logger initialization lives here; the rest of the crate only uses the `log`
//! facade.

mod init;

pub use init::{init_logging, LoggingConfig};
