#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types and flow for stablecoin-funded merchant QR payments.
//!
//! This crate drives a fixed five-stage payment against a synthetic-payment
//! API: resolve a deposit address, lock a merchant QR payload, wait until the
//! user's stablecoin balance covers the lock, submit the payment, and monitor
//! it until it completes or is cancelled.
//!
//! It is transport-agnostic: the remote API is abstracted by
//! [`api::PaymentApi`], implemented over HTTP by the `qrpay-http` crate.
//!
//! # Modules
//!
//! - [`amount`] - Exact decimal amounts parsed from strings or numbers
//! - [`api`] - The payment API trait consumed by the flow
//! - [`config`] - Credentials and per-run flow settings
//! - [`error`] - Flow errors, attributed to the stage that failed
//! - [`flow`] - The five stages and the orchestrator
//! - [`poll`] - Fixed-interval polling with cap and cancellation
//! - [`proto`] - Wire schemas for every endpoint the flow uses
//! - [`wait`] - Operator control over the balance wait

pub mod amount;
pub mod api;
pub mod config;
pub mod error;
pub mod flow;
pub mod poll;
pub mod proto;
pub mod wait;

pub use amount::Amount;
pub use api::{ApiFailure, PaymentApi};
pub use config::{Credentials, FlowSettings};
pub use error::{FlowError, Stage};
pub use flow::{BalanceOutcome, FlowReport, PaymentFlow, PaymentOutcome};
