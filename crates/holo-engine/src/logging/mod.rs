//! Logging utilities.
//!
//! Centralizes logger initialization and the device diagnostics emitted by
//! the engine. Everything goes through the `log` facade.

mod diagnostics;
mod init;

pub(crate) use diagnostics::log_adapter;
pub use init::{LoggingConfig, init_logging};
