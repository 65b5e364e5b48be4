//! Error types for the payment flow.

use std::fmt;

use crate::amount::Amount;
use crate::api::ApiFailure;
use crate::poll::PollError;

/// The flow stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Deposit address lookup.
    DepositAddress,
    /// Payment lock creation.
    PaymentLock,
    /// Waiting for the balance to cover the lock.
    BalanceWait,
    /// Synthetic payment submission.
    PaymentSubmit,
    /// Payment status monitoring.
    StatusMonitor,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DepositAddress => "deposit address",
            Self::PaymentLock => "payment lock",
            Self::BalanceWait => "balance wait",
            Self::PaymentSubmit => "payment submit",
            Self::StatusMonitor => "status monitor",
        })
    }
}

/// Fatal errors that abort a payment flow run.
#[derive(Debug, thiserror::Error)]
pub enum FlowError<E> {
    /// A request to the payment API failed.
    #[error("{stage} failed: {source}")]
    Api {
        /// Stage that issued the request.
        stage: Stage,
        /// The API error.
        #[source]
        source: E,
    },

    /// The deposit info did not include the preferred network.
    #[error("no deposit address for network {network} (available: {})", .available.join(", "))]
    MissingNetwork {
        /// The requested network.
        network: String,
        /// Networks present in the response.
        available: Vec<String>,
    },

    /// The lock reported a negative required amount.
    #[error("payment lock returned a negative amount: {amount}")]
    NegativeAmount {
        /// The rejected amount.
        amount: Amount,
    },

    /// A polling stage hit its attempt cap.
    #[error("{stage} gave up after {attempts} polls")]
    Exhausted {
        /// The polling stage.
        stage: Stage,
        /// Number of polls performed.
        attempts: u32,
    },

    /// A polling stage was cancelled.
    #[error("{stage} cancelled after {attempts} polls")]
    Cancelled {
        /// The polling stage.
        stage: Stage,
        /// Number of polls performed.
        attempts: u32,
    },
}

impl<E> FlowError<E> {
    /// Returns a mapper that attributes an API error to `stage`.
    pub(crate) fn api(stage: Stage) -> impl FnOnce(E) -> Self {
        move |source| Self::Api { stage, source }
    }

    pub(crate) fn from_poll(stage: Stage, err: PollError<Self>) -> Self {
        match err {
            PollError::Check(err) => err,
            PollError::Exhausted { attempts } => Self::Exhausted { stage, attempts },
            PollError::Cancelled { attempts } => Self::Cancelled { stage, attempts },
        }
    }

    /// Returns the stage this error is attributed to.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Api { stage, .. } | Self::Exhausted { stage, .. } | Self::Cancelled { stage, .. } => {
                *stage
            }
            Self::MissingNetwork { .. } => Stage::DepositAddress,
            Self::NegativeAmount { .. } => Stage::PaymentLock,
        }
    }
}

impl<E: ApiFailure> FlowError<E> {
    /// The structured error payload from the remote service, if the failure
    /// carried one.
    #[must_use]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api { source, .. } => source.payload(),
            _ => None,
        }
    }
}
