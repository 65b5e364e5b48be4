//! Error types for the HTTP API client.

use http::StatusCode;
use qrpay::ApiFailure;

/// Errors that can occur while talking to the payment API.
#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The base URL cannot have path segments appended (e.g. `mailto:`).
    #[error("base URL cannot carry endpoint paths: {url}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
    },
    /// The API key is not a valid header value.
    #[error("API key is not a valid header value: {0}")]
    InvalidApiKey(#[source] http::header::InvalidHeaderValue),
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Non-success HTTP status.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The raw response body.
        body: String,
        /// The body parsed as JSON, when it is JSON.
        payload: Option<serde_json::Value>,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

impl ApiClientError {
    /// Returns the HTTP status for [`ApiClientError::HttpStatus`] errors.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl ApiFailure for ApiClientError {
    fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::HttpStatus { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}
