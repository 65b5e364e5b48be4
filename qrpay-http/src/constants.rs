//! HTTP constants for the synthetic-payment API.

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "md-api-key";

/// Query parameter naming the user on deposit-info requests.
pub const USER_ANY_ID_PARAM: &str = "userAnyId";

/// Path segments of `GET /info/deposit-info/{symbol}`.
pub const DEPOSIT_INFO_PATH: &[&str] = &["info", "deposit-info"];

/// Path segments of `POST /payment-locks`.
pub const PAYMENT_LOCKS_PATH: &[&str] = &["payment-locks"];

/// Path segments of `GET /user-balances/{id}`.
pub const USER_BALANCES_PATH: &[&str] = &["user-balances"];

/// Path segments of `POST /synthetics/qr-payment`.
pub const QR_PAYMENT_PATH: &[&str] = &["synthetics", "qr-payment"];

/// Path segments of `GET /synthetics/{id}`.
pub const SYNTHETICS_PATH: &[&str] = &["synthetics"];
