//! The five-stage QR payment flow.
//!
//! A run resolves the deposit address, locks the merchant QR payload, waits
//! for the balance to cover the lock, submits the synthetic payment and
//! monitors it until it completes or is cancelled. Stages run strictly in
//! order; any fatal error aborts the rest of the run.
//!
//! Re-running a failed flow starts again from the first stage and creates a
//! new lock server-side.

use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::amount::Amount;
use crate::api::PaymentApi;
use crate::config::FlowSettings;
use crate::error::{FlowError, Stage};
use crate::poll::Poller;
use crate::proto::{PaymentLock, PaymentLockRequest, SyntheticPaymentRequest, SyntheticStatus};
use crate::wait::WaitControl;

/// How the balance wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceOutcome {
    /// The balance reached the required amount.
    Funded {
        /// The balance observed on the final poll.
        balance: Amount,
    },
    /// The operator disabled the wait through the wait control.
    Skipped,
}

/// Terminal state of a synthetic payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The payment settled.
    Completed,
    /// The payment was cancelled.
    Cancelled,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReport {
    /// Deposit address on the preferred network.
    pub deposit_address: String,
    /// The lock created for the QR payload.
    pub lock: PaymentLock,
    /// How the balance wait ended.
    pub balance: BalanceOutcome,
    /// Identifier of the synthetic payment.
    pub payment_id: String,
    /// Terminal payment state.
    pub outcome: PaymentOutcome,
}

/// Drives one payment flow run against a [`PaymentApi`].
#[derive(Debug)]
pub struct PaymentFlow<A, W> {
    api: A,
    wait_control: W,
    settings: FlowSettings,
    cancellation: Option<CancellationToken>,
}

impl<A, W> PaymentFlow<A, W>
where
    A: PaymentApi,
    W: WaitControl,
{
    /// Creates a flow over `api`, consulting `wait_control` during the
    /// balance wait.
    pub const fn new(api: A, wait_control: W, settings: FlowSettings) -> Self {
        Self {
            api,
            wait_control,
            settings,
            cancellation: None,
        }
    }

    /// Lets `token` cancel the polling stages.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the API the flow talks to.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Returns the run settings.
    pub const fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Runs all five stages in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`FlowError`] raised by any stage; later stages are
    /// not started.
    pub async fn run(&self) -> Result<FlowReport, FlowError<A::Error>> {
        let deposit_address = self.resolve_deposit_address().await?;
        let lock = self.lock_payment().await?;
        let balance = self.wait_for_balance(lock.required_amount).await?;
        let payment_id = self.submit_payment(&lock.code).await?;
        let outcome = self.monitor_payment(&payment_id).await?;
        Ok(FlowReport {
            deposit_address,
            lock,
            balance,
            payment_id,
            outcome,
        })
    }

    /// Stage 1: returns the deposit address on the preferred network.
    ///
    /// # Errors
    ///
    /// [`FlowError::Api`] if the request fails, [`FlowError::MissingNetwork`]
    /// if the preferred network is absent. No other network is tried.
    pub async fn resolve_deposit_address(&self) -> Result<String, FlowError<A::Error>> {
        let settings = &self.settings;
        tracing::info!(symbol = %settings.symbol, "Fetching deposit addresses");

        let info = self
            .api
            .deposit_info(&settings.symbol, &settings.user_id)
            .await
            .map_err(FlowError::api(Stage::DepositAddress))?;
        tracing::debug!(networks = ?info.networks(), "Deposit addresses received");

        let address = info
            .address(&settings.network)
            .ok_or_else(|| FlowError::MissingNetwork {
                network: settings.network.clone(),
                available: info.networks(),
            })?
            .to_owned();
        tracing::info!(network = %settings.network, %address, "Deposit address resolved");
        Ok(address)
    }

    /// Stage 2: locks the QR payload and returns the lock code and the
    /// required amount.
    ///
    /// Called at most once per run; every call creates a new lock.
    ///
    /// # Errors
    ///
    /// [`FlowError::Api`] if the request fails, [`FlowError::NegativeAmount`]
    /// if the lock reports an amount below zero.
    pub async fn lock_payment(&self) -> Result<PaymentLock, FlowError<A::Error>> {
        let settings = &self.settings;
        tracing::info!("Locking QR payment");

        let request = PaymentLockRequest {
            user_any_id: settings.user_id.clone(),
            payment_destination: settings.qr_payload.clone(),
            against: settings.symbol.clone(),
        };
        let lock = self
            .api
            .lock_payment(&request)
            .await
            .map_err(FlowError::api(Stage::PaymentLock))?;

        if lock.required_amount.is_negative() {
            return Err(FlowError::NegativeAmount {
                amount: lock.required_amount,
            });
        }
        tracing::info!(
            code = %lock.code,
            required = %lock.required_amount,
            symbol = %settings.symbol,
            "Payment locked"
        );
        Ok(lock)
    }

    /// Stage 3: polls the balance until it covers `required`, or until the
    /// wait control says to stop waiting.
    ///
    /// The wait control is consulted before every balance request. A missing
    /// balance counts as zero.
    ///
    /// # Errors
    ///
    /// [`FlowError::Api`] if a balance request fails, [`FlowError::Exhausted`]
    /// or [`FlowError::Cancelled`] if the poll is capped or cancelled.
    pub async fn wait_for_balance(
        &self,
        required: Amount,
    ) -> Result<BalanceOutcome, FlowError<A::Error>> {
        let settings = &self.settings;
        tracing::info!(
            %required,
            symbol = %settings.symbol,
            "Waiting for funds (set waitForBalance=false to continue immediately)"
        );

        self.poller(settings.balance_poll_interval, settings.max_balance_polls)
            .run(move |attempt| self.check_balance(attempt, required))
            .await
            .map_err(|e| FlowError::from_poll(Stage::BalanceWait, e))
    }

    /// Stage 4: submits the synthetic payment for `lock_code` and returns its
    /// identifier.
    ///
    /// # Errors
    ///
    /// [`FlowError::Api`] if the request fails.
    pub async fn submit_payment(&self, lock_code: &str) -> Result<String, FlowError<A::Error>> {
        let settings = &self.settings;
        tracing::info!("Submitting QR payment");

        let request = SyntheticPaymentRequest {
            external_id: settings.external_id.clone(),
            session_id: settings.session_id.clone(),
            user_any_id: settings.user_id.clone(),
            qr_code: lock_code.to_owned(),
            disallow_debt: true,
        };
        let payment = self
            .api
            .submit_qr_payment(&request)
            .await
            .map_err(FlowError::api(Stage::PaymentSubmit))?;
        tracing::info!(id = %payment.id, status = %payment.status, "Payment started");
        Ok(payment.id)
    }

    /// Stage 5: polls the payment until it is `COMPLETED` or `CANCELLED`.
    ///
    /// Every other status, including unknown ones, keeps the poll going.
    ///
    /// # Errors
    ///
    /// [`FlowError::Api`] if a status request fails, [`FlowError::Exhausted`]
    /// or [`FlowError::Cancelled`] if the poll is capped or cancelled.
    pub async fn monitor_payment(
        &self,
        payment_id: &str,
    ) -> Result<PaymentOutcome, FlowError<A::Error>> {
        let settings = &self.settings;
        tracing::info!(id = %payment_id, "Monitoring payment status");

        self.poller(settings.status_poll_interval, settings.max_status_polls)
            .run(move |attempt| self.check_status(attempt, payment_id))
            .await
            .map_err(|e| FlowError::from_poll(Stage::StatusMonitor, e))
    }

    async fn check_balance(
        &self,
        attempt: u32,
        required: Amount,
    ) -> Result<ControlFlow<BalanceOutcome>, FlowError<A::Error>> {
        if !self.wait_control.current_wait_policy() {
            tracing::info!("waitForBalance=false, continuing without funds");
            return Ok(ControlFlow::Break(BalanceOutcome::Skipped));
        }

        let symbol = &self.settings.symbol;
        let balance = self
            .api
            .user_balances(&self.settings.user_id)
            .await
            .map_err(FlowError::api(Stage::BalanceWait))?
            .available(symbol);
        tracing::info!(attempt, %balance, %required, %symbol, "Balance checked");

        if balance >= required {
            tracing::info!(%balance, "Funds detected");
            Ok(ControlFlow::Break(BalanceOutcome::Funded { balance }))
        } else {
            Ok(ControlFlow::Continue(()))
        }
    }

    async fn check_status(
        &self,
        attempt: u32,
        payment_id: &str,
    ) -> Result<ControlFlow<PaymentOutcome>, FlowError<A::Error>> {
        let payment = self
            .api
            .synthetic_payment(payment_id)
            .await
            .map_err(FlowError::api(Stage::StatusMonitor))?;
        tracing::info!(attempt, status = %payment.status, "Payment status");

        Ok(match payment.status {
            SyntheticStatus::Completed => {
                tracing::info!(id = %payment_id, "Payment completed");
                ControlFlow::Break(PaymentOutcome::Completed)
            }
            SyntheticStatus::Cancelled => {
                tracing::warn!(id = %payment_id, "Payment cancelled");
                ControlFlow::Break(PaymentOutcome::Cancelled)
            }
            SyntheticStatus::Pending(_) => ControlFlow::Continue(()),
        })
    }

    fn poller(&self, interval: Duration, max_attempts: Option<NonZeroU32>) -> Poller {
        let poller = Poller::new(interval).with_max_attempts(max_attempts);
        match &self.cancellation {
            Some(token) => poller.with_cancellation(token.clone()),
            None => poller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiFailure;
    use crate::proto::{DepositInfo, SyntheticPayment, UserBalances};
    use crate::wait::SharedWaitControl;
    use serde_json::{Value, json};
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    #[derive(Debug, Clone, thiserror::Error)]
    #[error("fake api error: HTTP {status}")]
    struct FakeError {
        status: u16,
        payload: Option<Value>,
    }

    impl ApiFailure for FakeError {
        fn payload(&self) -> Option<&Value> {
            self.payload.as_ref()
        }
    }

    /// Scripted API. Balance and status sequences repeat their last entry.
    #[derive(Debug)]
    struct FakeApi {
        deposit_info: DepositInfo,
        lock: Result<PaymentLock, FakeError>,
        balances: Mutex<VecDeque<&'static str>>,
        statuses: Mutex<VecDeque<&'static str>>,
        flip_wait_after: Option<(usize, SharedWaitControl)>,
        calls: Mutex<Vec<&'static str>>,
        lock_requests: Mutex<Vec<PaymentLockRequest>>,
        submit_requests: Mutex<Vec<SyntheticPaymentRequest>>,
    }

    impl FakeApi {
        fn new() -> Self {
            let mut networks = BTreeMap::new();
            networks.insert("BASE".to_owned(), json!({ "address": "0xabc" }));
            Self {
                deposit_info: DepositInfo(networks),
                lock: Ok(PaymentLock {
                    code: "lock123".to_owned(),
                    required_amount: "5.00".parse().unwrap(),
                }),
                balances: Mutex::new(VecDeque::from(["5"])),
                statuses: Mutex::new(VecDeque::from(["COMPLETED"])),
                flip_wait_after: None,
                calls: Mutex::new(Vec::new()),
                lock_requests: Mutex::new(Vec::new()),
                submit_requests: Mutex::new(Vec::new()),
            }
        }

        fn with_balances(self, balances: &[&'static str]) -> Self {
            *self.balances.lock().unwrap() = balances.iter().copied().collect();
            self
        }

        fn with_statuses(self, statuses: &[&'static str]) -> Self {
            *self.statuses.lock().unwrap() = statuses.iter().copied().collect();
            self
        }

        fn calls(&self, name: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
        }

        fn record(&self, name: &'static str) -> usize {
            let mut calls = self.calls.lock().unwrap();
            calls.push(name);
            calls.iter().filter(|c| **c == name).count()
        }

        fn next(queue: &Mutex<VecDeque<&'static str>>) -> &'static str {
            let mut queue = queue.lock().unwrap();
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().copied().unwrap_or_default()
            }
        }
    }

    #[async_trait::async_trait]
    impl PaymentApi for FakeApi {
        type Error = FakeError;

        async fn deposit_info(&self, _symbol: &str, _user_id: &str) -> Result<DepositInfo, FakeError> {
            self.record("deposit_info");
            Ok(self.deposit_info.clone())
        }

        async fn lock_payment(&self, request: &PaymentLockRequest) -> Result<PaymentLock, FakeError> {
            self.record("lock_payment");
            self.lock_requests.lock().unwrap().push(request.clone());
            self.lock.clone()
        }

        async fn user_balances(&self, _user_id: &str) -> Result<UserBalances, FakeError> {
            let n = self.record("user_balances");
            if let Some((after, control)) = &self.flip_wait_after {
                if n >= *after {
                    control.set(false);
                }
            }
            let mut balance = BTreeMap::new();
            balance.insert("USDC".to_owned(), json!(Self::next(&self.balances)));
            Ok(UserBalances { balance })
        }

        async fn submit_qr_payment(
            &self,
            request: &SyntheticPaymentRequest,
        ) -> Result<SyntheticPayment, FakeError> {
            self.record("submit_qr_payment");
            self.submit_requests.lock().unwrap().push(request.clone());
            Ok(SyntheticPayment {
                id: "syn-1".to_owned(),
                status: SyntheticStatus::from("PENDING"),
            })
        }

        async fn synthetic_payment(&self, id: &str) -> Result<SyntheticPayment, FakeError> {
            self.record("synthetic_payment");
            Ok(SyntheticPayment {
                id: id.to_owned(),
                status: SyntheticStatus::from(Self::next(&self.statuses)),
            })
        }
    }

    fn flow(api: FakeApi) -> PaymentFlow<FakeApi, SharedWaitControl> {
        flow_with(api, SharedWaitControl::default())
    }

    fn flow_with(api: FakeApi, control: SharedWaitControl) -> PaymentFlow<FakeApi, SharedWaitControl> {
        PaymentFlow::new(api, control, FlowSettings::new("user-1"))
    }

    #[tokio::test]
    async fn test_resolves_preferred_network() {
        let flow = flow(FakeApi::new());
        assert_eq!(flow.resolve_deposit_address().await.unwrap(), "0xabc");
    }

    #[tokio::test]
    async fn test_missing_network_is_fatal() {
        let mut settings = FlowSettings::new("user-1");
        settings.network = "SOLANA".to_owned();
        let flow = PaymentFlow::new(FakeApi::new(), SharedWaitControl::default(), settings);

        let err = flow.resolve_deposit_address().await.unwrap_err();
        match err {
            FlowError::MissingNetwork { network, available } => {
                assert_eq!(network, "SOLANA");
                assert_eq!(available, vec!["BASE"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_null_preferred_entry_is_missing_network() {
        let mut api = FakeApi::new();
        api.deposit_info.0.insert("BASE".to_owned(), Value::Null);
        api.deposit_info
            .0
            .insert("ETHEREUM".to_owned(), json!({ "address": "0xdef" }));
        let flow = flow(api);

        let err = flow.resolve_deposit_address().await.unwrap_err();
        assert!(matches!(err, FlowError::MissingNetwork { ref network, .. } if network == "BASE"));
        assert_eq!(err.stage(), Stage::DepositAddress);
    }

    #[tokio::test]
    async fn test_lock_returns_code_and_amount() {
        let flow = flow(FakeApi::new());
        let lock = flow.lock_payment().await.unwrap();
        assert_eq!(lock.code, "lock123");
        assert_eq!(lock.required_amount, Amount::from(5));

        let requests = flow.api().lock_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_any_id, "user-1");
        assert_eq!(requests[0].against, "USDC");
        assert_eq!(requests[0].payment_destination, crate::config::DEFAULT_QR_PAYLOAD);
    }

    #[tokio::test]
    async fn test_negative_lock_amount_is_rejected() {
        let mut api = FakeApi::new();
        api.lock = Ok(PaymentLock {
            code: "lock123".to_owned(),
            required_amount: "-1".parse().unwrap(),
        });
        let err = flow(api).lock_payment().await.unwrap_err();
        assert!(matches!(err, FlowError::NegativeAmount { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_wait_stops_when_funded() {
        let flow = flow(FakeApi::new().with_balances(&["2", "5"]));
        let outcome = flow.wait_for_balance(Amount::from(5)).await.unwrap();
        assert_eq!(
            outcome,
            BalanceOutcome::Funded {
                balance: Amount::from(5)
            }
        );
        assert_eq!(flow.api().calls("user_balances"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_wait_accepts_surplus() {
        let flow = flow(FakeApi::new().with_balances(&["0", "1.5", "7.25", "9"]));
        let outcome = flow.wait_for_balance("5.0".parse().unwrap()).await.unwrap();
        assert_eq!(
            outcome,
            BalanceOutcome::Funded {
                balance: "7.25".parse().unwrap()
            }
        );
        assert_eq!(flow.api().calls("user_balances"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_wait_skipped_by_flag() {
        let control = SharedWaitControl::new(false);
        let flow = flow_with(FakeApi::new().with_balances(&["0"]), control);
        let outcome = flow.wait_for_balance(Amount::from(5)).await.unwrap();
        assert_eq!(outcome, BalanceOutcome::Skipped);
        assert_eq!(flow.api().calls("user_balances"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_flip_exits_on_next_iteration() {
        let control = SharedWaitControl::default();
        let mut api = FakeApi::new().with_balances(&["0"]);
        api.flip_wait_after = Some((3, control.clone()));
        let flow = flow_with(api, control);

        let outcome = flow.wait_for_balance(Amount::from(5)).await.unwrap();
        assert_eq!(outcome, BalanceOutcome::Skipped);
        assert_eq!(flow.api().calls("user_balances"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_wait_cap() {
        let mut settings = FlowSettings::new("user-1");
        settings.max_balance_polls = NonZeroU32::new(4);
        let flow = PaymentFlow::new(
            FakeApi::new().with_balances(&["1"]),
            SharedWaitControl::default(),
            settings,
        );
        let err = flow.wait_for_balance(Amount::from(5)).await.unwrap_err();
        assert!(matches!(
            err,
            FlowError::Exhausted {
                stage: Stage::BalanceWait,
                attempts: 4
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_wait_cancellation() {
        let token = CancellationToken::new();
        let flow = flow(FakeApi::new().with_balances(&["0"])).with_cancellation(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            token.cancel();
        });
        let err = flow.wait_for_balance(Amount::from(5)).await.unwrap_err();
        assert!(matches!(
            err,
            FlowError::Cancelled {
                stage: Stage::BalanceWait,
                attempts: 3
            }
        ));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_sends_lock_code_without_debt() {
        let flow = flow(FakeApi::new());
        let id = flow.submit_payment("lock123").await.unwrap();
        assert_eq!(id, "syn-1");

        let requests = flow.api().submit_requests.lock().unwrap();
        assert_eq!(requests[0].qr_code, "lock123");
        assert!(requests[0].disallow_debt);
        assert_eq!(requests[0].external_id, crate::config::DEFAULT_EXTERNAL_ID);
        assert_eq!(requests[0].session_id, crate::config::DEFAULT_SESSION_ID);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_polls_until_completed() {
        let flow = flow(FakeApi::new().with_statuses(&["PENDING", "PENDING", "COMPLETED"]));
        let outcome = flow.monitor_payment("syn-1").await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Completed);
        assert_eq!(flow.api().calls("synthetic_payment"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_stops_on_cancelled() {
        let flow = flow(FakeApi::new().with_statuses(&["PROCESSING", "CANCELLED"]));
        let outcome = flow.monitor_payment("syn-1").await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Cancelled);
        assert_eq!(flow.api().calls("synthetic_payment"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_keeps_polling_unknown_statuses() {
        let mut settings = FlowSettings::new("user-1");
        settings.max_status_polls = NonZeroU32::new(5);
        let flow = PaymentFlow::new(
            FakeApi::new().with_statuses(&["", "FAILED", "completed", "UNKNOWN"]),
            SharedWaitControl::default(),
            settings,
        );
        let err = flow.monitor_payment("syn-1").await.unwrap_err();
        assert!(matches!(
            err,
            FlowError::Exhausted {
                stage: Stage::StatusMonitor,
                attempts: 5
            }
        ));
        assert_eq!(flow.api().calls("synthetic_payment"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_executes_stages_in_order() {
        let flow = flow(
            FakeApi::new()
                .with_balances(&["2", "5"])
                .with_statuses(&["PENDING", "COMPLETED"]),
        );
        let report = flow.run().await.unwrap();
        assert_eq!(report.deposit_address, "0xabc");
        assert_eq!(report.lock.code, "lock123");
        assert_eq!(report.payment_id, "syn-1");
        assert_eq!(report.outcome, PaymentOutcome::Completed);

        let calls = flow.api().calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "deposit_info",
                "lock_payment",
                "user_balances",
                "user_balances",
                "submit_qr_payment",
                "synthetic_payment",
                "synthetic_payment",
            ]
        );
    }

    #[tokio::test]
    async fn test_lock_failure_aborts_remaining_stages() {
        let mut api = FakeApi::new();
        api.lock = Err(FakeError {
            status: 500,
            payload: Some(json!({ "message": "internal error" })),
        });
        let flow = flow(api);

        let err = flow.run().await.unwrap_err();
        assert_eq!(err.stage(), Stage::PaymentLock);
        assert_eq!(err.payload(), Some(&json!({ "message": "internal error" })));
        assert_eq!(flow.api().calls("user_balances"), 0);
        assert_eq!(flow.api().calls("submit_qr_payment"), 0);
        assert_eq!(flow.api().calls("synthetic_payment"), 0);
    }
}
