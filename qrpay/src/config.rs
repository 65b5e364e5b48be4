//! Run-scoped configuration for the payment flow.
//!
//! Configuration is built once at process start and passed by value into the
//! API client and the flow. Nothing in the flow reads the environment.

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// A pre-decoded EMV-style merchant QR payload.
///
/// Opaque to this crate: it is forwarded to the lock endpoint unchanged.
pub const DEFAULT_QR_PAYLOAD: &str = "00020101021140200010com.yacare02022350150011336972350495204739953030325802AR5910HAVANNA SA6012BUENOS AIRES81220010com.yacare0204Y2156304E401";

/// Stablecoin the payment is funded with.
pub const DEFAULT_SYMBOL: &str = "USDC";

/// Network whose deposit address is reported.
pub const DEFAULT_NETWORK: &str = "BASE";

/// Placeholder correlation id sent with the synthetic payment.
pub const DEFAULT_EXTERNAL_ID: &str = "qrpay-external-id";

/// Placeholder session id sent with the synthetic payment.
pub const DEFAULT_SESSION_ID: &str = "qrpay-session-id";

/// Interval between balance checks.
pub const DEFAULT_BALANCE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Interval between payment status checks.
pub const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Credentials for the payment API.
///
/// The API key is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Value of the `md-api-key` header.
    pub api_key: String,

    /// Base URL of the API (e.g. `https://api.example.com/v1`).
    pub base_url: String,

    /// The user every operation acts on behalf of.
    pub user_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Parameters of a single payment flow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSettings {
    /// The paying user.
    pub user_id: String,

    /// Stablecoin symbol used for deposits, locks and balance checks.
    pub symbol: String,

    /// Preferred deposit network. There is no fallback network.
    pub network: String,

    /// Merchant QR payload submitted to the lock endpoint.
    pub qr_payload: String,

    /// Correlation id sent with the synthetic payment.
    pub external_id: String,

    /// Session id sent with the synthetic payment.
    pub session_id: String,

    /// Sleep between balance checks.
    pub balance_poll_interval: Duration,

    /// Sleep between status checks.
    pub status_poll_interval: Duration,

    /// Optional cap on balance checks. `None` waits forever.
    pub max_balance_polls: Option<NonZeroU32>,

    /// Optional cap on status checks. `None` waits forever.
    pub max_status_polls: Option<NonZeroU32>,
}

impl FlowSettings {
    /// Creates settings for `user_id` with every other field at its default.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            symbol: DEFAULT_SYMBOL.to_owned(),
            network: DEFAULT_NETWORK.to_owned(),
            qr_payload: DEFAULT_QR_PAYLOAD.to_owned(),
            external_id: DEFAULT_EXTERNAL_ID.to_owned(),
            session_id: DEFAULT_SESSION_ID.to_owned(),
            balance_poll_interval: DEFAULT_BALANCE_POLL_INTERVAL,
            status_poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            max_balance_polls: None,
            max_status_polls: None,
        }
    }

    /// Sets both polling intervals.
    #[must_use]
    pub const fn with_poll_intervals(mut self, balance: Duration, status: Duration) -> Self {
        self.balance_poll_interval = balance;
        self.status_poll_interval = status;
        self
    }
}
