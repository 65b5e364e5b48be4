//! HTTP transport for the qrpay payment flow.
//!
//! Provides [`PaymentApiClient`], a `reqwest`-based implementation of
//! [`qrpay::PaymentApi`] for the synthetic-payment API, plus the header name
//! and endpoint paths it speaks.
//!
//! # Modules
//!
//! - [`constants`] - Header name and endpoint paths
//! - [`error`] - HTTP client error types
//! - [`client`] - The API client
//!
//! # Feature Flags
//!
//! - `telemetry` - Wraps each API call in a `tracing` span and records its
//!   outcome

pub mod client;
pub mod constants;
pub mod error;

pub use client::PaymentApiClient;
pub use error::ApiClientError;
