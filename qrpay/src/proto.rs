//! Wire types for the synthetic-payment API.
//!
//! Every endpoint the payment flow touches has an explicit schema here.
//! Required fields fail deserialization when absent; optional fields carry a
//! documented default instead of being probed ad hoc in the flow logic.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::amount::Amount;

/// Response of `GET /info/deposit-info/{symbol}`: deposit entries keyed by
/// network name (e.g. `"BASE"`).
///
/// Entries stay raw until one is selected, so a malformed entry for a network
/// the flow does not use cannot fail the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepositInfo(pub BTreeMap<String, Value>);

impl DepositInfo {
    /// Returns the `address` string reported for `network`.
    ///
    /// `None` if the network is absent or its entry has no string `address`.
    #[must_use]
    pub fn address(&self, network: &str) -> Option<&str> {
        self.0
            .get(network)
            .and_then(|entry| entry.get("address"))
            .and_then(Value::as_str)
    }

    /// Returns the names of all networks present in the response.
    #[must_use]
    pub fn networks(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

/// Body of `POST /payment-locks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLockRequest {
    /// The user the lock is created for.
    pub user_any_id: String,

    /// The merchant QR payload, forwarded verbatim.
    pub payment_destination: String,

    /// The stablecoin the payment is funded with (e.g. `"USDC"`).
    pub against: String,
}

/// A server-side lock fixing the stablecoin amount for a QR payment.
///
/// Decoded from the `POST /payment-locks` response. Both fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLock {
    /// Opaque lock code, later submitted as the synthetic payment's `qrCode`.
    pub code: String,

    /// Stablecoin amount required to settle the payment.
    #[serde(rename = "paymentAgainstAmount")]
    pub required_amount: Amount,
}

/// Response of `GET /user-balances/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalances {
    /// Raw balances keyed by symbol. Absent or `null` means empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub balance: BTreeMap<String, Value>,
}

impl UserBalances {
    /// Returns the balance for `symbol`.
    ///
    /// Zero when the symbol is absent, `null`, or not an amount. Other
    /// symbols are never parsed.
    #[must_use]
    pub fn available(&self, symbol: &str) -> Amount {
        self.balance
            .get(symbol)
            .and_then(|raw| Amount::deserialize(raw).ok())
            .unwrap_or(Amount::ZERO)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /synthetics/qr-payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticPaymentRequest {
    /// Caller-side correlation identifier.
    pub external_id: String,

    /// Caller-side session identifier.
    pub session_id: String,

    /// The paying user.
    pub user_any_id: String,

    /// The lock code returned by `POST /payment-locks`.
    pub qr_code: String,

    /// When `true`, the payment must not put the user into debt.
    pub disallow_debt: bool,
}

/// A synthetic payment as returned by `POST /synthetics/qr-payment` and
/// `GET /synthetics/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticPayment {
    /// Payment identifier. Required.
    pub id: String,

    /// Current status. Absent means pending.
    #[serde(default)]
    pub status: SyntheticStatus,
}

/// Status of a synthetic payment.
///
/// The API's status vocabulary is open-ended. Only `COMPLETED` and
/// `CANCELLED` are terminal; every other value is kept verbatim as
/// [`SyntheticStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyntheticStatus {
    /// The payment settled.
    Completed,
    /// The payment was cancelled.
    Cancelled,
    /// Any non-terminal status, including unknown, empty and non-string ones.
    Pending(String),
}

impl SyntheticStatus {
    const COMPLETED: &'static str = "COMPLETED";
    const CANCELLED: &'static str = "CANCELLED";

    /// Returns `true` if no further transition is expected.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns the status as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => Self::COMPLETED,
            Self::Cancelled => Self::CANCELLED,
            Self::Pending(raw) => raw,
        }
    }
}

impl Default for SyntheticStatus {
    fn default() -> Self {
        Self::Pending(String::new())
    }
}

impl From<&str> for SyntheticStatus {
    fn from(value: &str) -> Self {
        match value {
            Self::COMPLETED => Self::Completed,
            Self::CANCELLED => Self::Cancelled,
            other => Self::Pending(other.to_owned()),
        }
    }
}

impl Display for SyntheticStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SyntheticStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SyntheticStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(raw) => Self::from(raw.as_str()),
            Value::Null => Self::default(),
            other => Self::Pending(other.to_string()),
        })
    }
}
