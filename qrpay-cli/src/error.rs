//! Error types for the runner.

use qrpay::FlowError;
use qrpay_http::ApiClientError;

/// Invalid runner configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value was given but is blank.
    #[error("{name} must not be empty")]
    Empty {
        /// Environment variable name of the value.
        name: &'static str,
    },
}

/// Errors that end a run with a non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Shutdown signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    /// The API client could not be built.
    #[error("invalid API client settings: {0}")]
    Client(#[from] ApiClientError),

    /// A flow stage failed.
    #[error(transparent)]
    Flow(#[from] FlowError<ApiClientError>),
}

impl RunError {
    /// The structured error payload returned by the payment API, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Flow(err) => err.payload(),
            _ => None,
        }
    }
}
