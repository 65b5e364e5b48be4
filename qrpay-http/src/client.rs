//! A [`qrpay::PaymentApi`] implementation that talks to the synthetic-payment
//! API over HTTP.
//!
//! ## Features
//!
//! - Uses `reqwest` for async HTTP requests
//! - Sends the `md-api-key` header on every request
//! - Supports optional per-request timeout and extra headers
//! - Integrates with `tracing` if the `telemetry` feature is enabled
//!
//! ## Error Handling
//!
//! [`ApiClientError`] captures detailed failure contexts, including
//! - URL construction
//! - HTTP transport failures
//! - JSON deserialization errors
//! - Non-success HTTP status responses, with the structured error payload
//!   when the body is JSON

use std::fmt::Display;
use std::time::Duration;

use http::header::HeaderValue;
use http::{HeaderMap, HeaderName};
use qrpay::proto::{
    DepositInfo, PaymentLock, PaymentLockRequest, SyntheticPayment, SyntheticPaymentRequest,
    UserBalances,
};
use qrpay::{Credentials, PaymentApi};
use reqwest::{Client, RequestBuilder};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::constants::{
    API_KEY_HEADER, DEPOSIT_INFO_PATH, PAYMENT_LOCKS_PATH, QR_PAYMENT_PATH, SYNTHETICS_PATH,
    USER_ANY_ID_PARAM, USER_BALANCES_PATH,
};
use crate::error::ApiClientError;

/// A client for the synthetic-payment API.
///
/// Endpoint paths are appended to the base URL, so a base URL with a path
/// prefix (`https://api.example.com/v1`) works as expected. Path segments
/// and query values are percent-encoded.
#[derive(Clone, Debug)]
pub struct PaymentApiClient {
    /// Base URL of the API
    base_url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Headers sent with each request, including the API key
    headers: HeaderMap,
    /// Optional request timeout
    timeout: Option<Duration>,
}

#[async_trait::async_trait]
impl PaymentApi for PaymentApiClient {
    type Error = ApiClientError;

    async fn deposit_info(&self, symbol: &str, user_id: &str) -> Result<DepositInfo, Self::Error> {
        Self::deposit_info(self, symbol, user_id).await
    }

    async fn lock_payment(&self, request: &PaymentLockRequest) -> Result<PaymentLock, Self::Error> {
        Self::lock_payment(self, request).await
    }

    async fn user_balances(&self, user_id: &str) -> Result<UserBalances, Self::Error> {
        Self::user_balances(self, user_id).await
    }

    async fn submit_qr_payment(
        &self,
        request: &SyntheticPaymentRequest,
    ) -> Result<SyntheticPayment, Self::Error> {
        Self::submit_qr_payment(self, request).await
    }

    async fn synthetic_payment(&self, id: &str) -> Result<SyntheticPayment, Self::Error> {
        Self::synthetic_payment(self, id).await
    }
}

impl PaymentApiClient {
    /// Constructs a client for `base_url` authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::InvalidBaseUrl`] if the URL cannot carry
    /// endpoint paths, or [`ApiClientError::InvalidApiKey`] if the key is not
    /// a valid header value.
    pub fn try_new(base_url: Url, api_key: &str) -> Result<Self, ApiClientError> {
        if base_url.cannot_be_a_base() {
            return Err(ApiClientError::InvalidBaseUrl {
                url: base_url.to_string(),
            });
        }
        let mut key = HeaderValue::from_str(api_key).map_err(ApiClientError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        Ok(Self {
            base_url,
            client: Client::new(),
            headers,
            timeout: None,
        })
    }

    /// Constructs a client from run credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the base URL does not parse or the API
    /// key is not a valid header value.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, ApiClientError> {
        let base_url =
            Url::parse(&credentials.base_url).map_err(|e| ApiClientError::UrlParse {
                context: "Failed to parse base url",
                source: e,
            })?;
        Self::try_new(base_url, &credentials.api_key)
    }

    /// Returns the base URL used by this client.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the headers sent with every request.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Adds extra headers to all future requests. The API key header is kept.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets a timeout for all future requests.
    ///
    /// Without one, a hung request blocks the run indefinitely.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the underlying Reqwest client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Sends `GET /info/deposit-info/{symbol}?userAnyId={user_id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "qrpay.api.deposit_info",
            skip_all,
            fields(symbol = %symbol, otel.status_code = tracing::field::Empty, error.message = tracing::field::Empty)
        )
    )]
    pub async fn deposit_info(
        &self,
        symbol: &str,
        user_id: &str,
    ) -> Result<DepositInfo, ApiClientError> {
        let mut url = self.endpoint(DEPOSIT_INFO_PATH, &[symbol])?;
        url.query_pairs_mut().append_pair(USER_ANY_ID_PARAM, user_id);
        self.send_json(self.client.get(url), "GET /info/deposit-info/{symbol}")
            .await
    }

    /// Sends `POST /payment-locks`.
    ///
    /// Every call creates a new lock server-side.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "qrpay.api.lock_payment",
            skip_all,
            fields(otel.status_code = tracing::field::Empty, error.message = tracing::field::Empty)
        )
    )]
    pub async fn lock_payment(
        &self,
        request: &PaymentLockRequest,
    ) -> Result<PaymentLock, ApiClientError> {
        let url = self.endpoint(PAYMENT_LOCKS_PATH, &[])?;
        self.send_json(self.client.post(url).json(request), "POST /payment-locks")
            .await
    }

    /// Sends `GET /user-balances/{user_id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "qrpay.api.user_balances",
            skip_all,
            fields(otel.status_code = tracing::field::Empty, error.message = tracing::field::Empty)
        )
    )]
    pub async fn user_balances(&self, user_id: &str) -> Result<UserBalances, ApiClientError> {
        let url = self.endpoint(USER_BALANCES_PATH, &[user_id])?;
        self.send_json(self.client.get(url), "GET /user-balances/{id}")
            .await
    }

    /// Sends `POST /synthetics/qr-payment`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "qrpay.api.submit_qr_payment",
            skip_all,
            fields(otel.status_code = tracing::field::Empty, error.message = tracing::field::Empty)
        )
    )]
    pub async fn submit_qr_payment(
        &self,
        request: &SyntheticPaymentRequest,
    ) -> Result<SyntheticPayment, ApiClientError> {
        let url = self.endpoint(QR_PAYMENT_PATH, &[])?;
        self.send_json(self.client.post(url).json(request), "POST /synthetics/qr-payment")
            .await
    }

    /// Sends `GET /synthetics/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "qrpay.api.synthetic_payment",
            skip_all,
            fields(id = %id, otel.status_code = tracing::field::Empty, error.message = tracing::field::Empty)
        )
    )]
    pub async fn synthetic_payment(&self, id: &str) -> Result<SyntheticPayment, ApiClientError> {
        let url = self.endpoint(SYNTHETICS_PATH, &[id])?;
        self.send_json(self.client.get(url), "GET /synthetics/{id}")
            .await
    }

    /// Appends `path` and then `params` as percent-encoded segments to the
    /// base URL.
    fn endpoint(&self, path: &[&str], params: &[&str]) -> Result<Url, ApiClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(path)
            .extend(params);
        Ok(url)
    }

    /// Generic send helper that handles headers, timeout application, error
    /// mapping and telemetry integration.
    ///
    /// Any 2xx status is a success. `context` is a human-readable identifier
    /// used in tracing and error messages (e.g. `"POST /payment-locks"`).
    async fn send_json<R>(
        &self,
        mut req: RequestBuilder,
        context: &'static str,
    ) -> Result<R, ApiClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        req = req.headers(self.headers.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| ApiClientError::Http { context, source: e })?;

        let result = if http_response.status().is_success() {
            http_response
                .json::<R>()
                .await
                .map_err(|e| ApiClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| ApiClientError::ResponseBodyRead { context, source: e })?;
            let payload = serde_json::from_str(&body).ok();
            Err(ApiClientError::HttpStatus {
                context,
                status,
                body,
                payload,
            })
        };

        record_result_on_span(&result);

        result
    }
}

/// Builds a client from run credentials.
impl TryFrom<&Credentials> for PaymentApiClient {
    type Error = ApiClientError;

    fn try_from(value: &Credentials) -> Result<Self, Self::Error> {
        Self::from_credentials(value)
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to payment API failed");
        }
    }
}

/// Records the outcome of a request on the current span.
/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}
