//! Logging utilities.
//!
//! This module centralizes logger initialization. Everything else in the
//! crate logs through the `log` facade only.

mod init;

pub use init::{init_logging, LoggingConfig, LOG_ENV};
