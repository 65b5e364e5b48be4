//! Runner configuration.
//!
//! Every setting can be given as a flag or an environment variable. A `.env`
//! file in the working directory is loaded first by the binary, so values in
//! it behave like regular environment variables.
//!
//! # Environment Variables
//!
//! - `API_KEY` - Value sent in the `md-api-key` header (required)
//! - `BASE_URL` - Base URL of the payment API (required)
//! - `USER_ID` - The paying user (required)
//! - `QR_CODE` - Merchant QR payload (default: built-in sample)
//! - `DEPOSIT_SYMBOL` - Stablecoin symbol (default: `USDC`)
//! - `DEPOSIT_NETWORK` - Preferred deposit network (default: `BASE`)
//! - `WAIT_CONTROL_FILE` - File holding `waitForBalance=` (default: `config.txt`)
//! - `EXTERNAL_ID` / `SESSION_ID` - Identifiers sent with the payment
//! - `REQUEST_TIMEOUT_SECS` - Per-request timeout (default: none)
//! - `MAX_BALANCE_POLLS` / `MAX_STATUS_POLLS` - Poll caps (default: unbounded)

use std::num::{NonZeroU32, NonZeroU64};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use qrpay::config::{
    DEFAULT_EXTERNAL_ID, DEFAULT_NETWORK, DEFAULT_QR_PAYLOAD, DEFAULT_SESSION_ID, DEFAULT_SYMBOL,
};
use qrpay::wait::DEFAULT_WAIT_CONTROL_FILE;
use qrpay::{Credentials, FlowSettings};

use crate::error::ConfigError;

/// Runs one stablecoin-funded QR payment against the payment API.
#[derive(Debug, Clone, Parser)]
#[command(name = "qrpay", version, about, long_about = None)]
pub struct Cli {
    /// API key sent in the `md-api-key` header
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the payment API
    #[arg(long, env = "BASE_URL")]
    pub base_url: String,

    /// The paying user
    #[arg(long, env = "USER_ID")]
    pub user_id: String,

    /// Merchant QR payload to lock
    #[arg(long, env = "QR_CODE", default_value = DEFAULT_QR_PAYLOAD, hide_default_value = true)]
    pub qr_code: String,

    /// Stablecoin symbol used for deposit, lock and balance
    #[arg(long, env = "DEPOSIT_SYMBOL", default_value = DEFAULT_SYMBOL)]
    pub deposit_symbol: String,

    /// Network whose deposit address is reported
    #[arg(long, env = "DEPOSIT_NETWORK", default_value = DEFAULT_NETWORK)]
    pub deposit_network: String,

    /// File consulted on every balance poll for `waitForBalance=true|false`
    #[arg(long, env = "WAIT_CONTROL_FILE", default_value = DEFAULT_WAIT_CONTROL_FILE)]
    pub wait_control_file: PathBuf,

    /// External id sent with the synthetic payment
    #[arg(long, env = "EXTERNAL_ID", default_value = DEFAULT_EXTERNAL_ID)]
    pub external_id: String,

    /// Session id sent with the synthetic payment
    #[arg(long, env = "SESSION_ID", default_value = DEFAULT_SESSION_ID)]
    pub session_id: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<NonZeroU64>,

    /// Give up after this many balance polls
    #[arg(long, env = "MAX_BALANCE_POLLS")]
    pub max_balance_polls: Option<NonZeroU32>,

    /// Give up after this many status polls
    #[arg(long, env = "MAX_STATUS_POLLS")]
    pub max_status_polls: Option<NonZeroU32>,
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// Flow parameters.
    pub settings: FlowSettings,
    /// Location of the wait-control file.
    pub wait_control_file: PathBuf,
    /// Optional per-request timeout.
    pub request_timeout: Option<Duration>,
}

impl Cli {
    /// Validates the parsed arguments and splits them into run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Empty`] if a required value is blank.
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        let api_key = require("API_KEY", self.api_key)?;
        let base_url = require("BASE_URL", self.base_url)?;
        let user_id = require("USER_ID", self.user_id)?;

        let mut settings = FlowSettings::new(user_id.clone());
        settings.symbol = self.deposit_symbol;
        settings.network = self.deposit_network;
        settings.qr_payload = self.qr_code;
        settings.external_id = self.external_id;
        settings.session_id = self.session_id;
        settings.max_balance_polls = self.max_balance_polls;
        settings.max_status_polls = self.max_status_polls;

        Ok(RunConfig {
            credentials: Credentials {
                api_key,
                base_url,
                user_id,
            },
            settings,
            wait_control_file: self.wait_control_file,
            request_timeout: self
                .request_timeout_secs
                .map(|secs| Duration::from_secs(secs.get())),
        })
    }
}

fn require(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty { name });
    }
    Ok(trimmed.to_owned())
}
