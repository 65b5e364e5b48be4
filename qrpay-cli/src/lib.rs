//! Command-line runner for the QR payment flow.
//!
//! Wires the HTTP client from `qrpay-http` into the flow from `qrpay`, with
//! configuration from flags, environment variables and an optional `.env`
//! file.
//!
//! # Modules
//!
//! - [`config`] - Flag and environment configuration
//! - [`error`] - Configuration and run errors
//! - [`util`] - Shutdown signal handling

pub mod config;
pub mod error;
pub mod util;

pub use config::{Cli, RunConfig};
pub use error::{ConfigError, RunError};
