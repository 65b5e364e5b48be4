//! The remote payment API as seen by the payment flow.
//!
//! [`PaymentApi`] is implemented over HTTP by `qrpay-http` and by in-memory
//! fakes in tests. The flow never builds requests itself; it only calls
//! these operations and interprets their typed results.

use crate::proto::{
    DepositInfo, PaymentLock, PaymentLockRequest, SyntheticPayment, SyntheticPaymentRequest,
    UserBalances,
};

/// An error produced by a [`PaymentApi`] implementation.
///
/// Implementations that receive a structured error body from the remote
/// service expose it through [`ApiFailure::payload`], so callers can report
/// the richest detail available.
pub trait ApiFailure: std::error::Error + Send + Sync + 'static {
    /// The structured error payload returned by the remote service, if any.
    fn payload(&self) -> Option<&serde_json::Value> {
        None
    }
}

/// Operations of the synthetic-payment API used by the payment flow.
#[async_trait::async_trait]
pub trait PaymentApi: Send + Sync {
    /// The error type returned by every operation.
    type Error: ApiFailure;

    /// `GET /info/deposit-info/{symbol}?userAnyId={user_id}`
    async fn deposit_info(&self, symbol: &str, user_id: &str) -> Result<DepositInfo, Self::Error>;

    /// `POST /payment-locks`
    ///
    /// Not idempotent: every call creates a new lock server-side.
    async fn lock_payment(&self, request: &PaymentLockRequest) -> Result<PaymentLock, Self::Error>;

    /// `GET /user-balances/{user_id}`
    async fn user_balances(&self, user_id: &str) -> Result<UserBalances, Self::Error>;

    /// `POST /synthetics/qr-payment`
    async fn submit_qr_payment(
        &self,
        request: &SyntheticPaymentRequest,
    ) -> Result<SyntheticPayment, Self::Error>;

    /// `GET /synthetics/{id}`
    async fn synthetic_payment(&self, id: &str) -> Result<SyntheticPayment, Self::Error>;
}
