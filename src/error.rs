//! OpenSec error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// OpenSec error type
#[derive(Error, Debug)]
pub enum Error {
    /// Request refused by the interceptor, the risk engine or the SQL firewall
    #[error("Security Block: {0}")]
    SecurityBlock(String),

    /// Model alias has no route
    #[error("Unknown model alias: {0}")]
    UnknownModel(String),

    /// Downstream agent is not registered
    #[error("Unknown target agent: {0}")]
    UnknownAgent(String),

    /// Policy flag does not exist
    #[error("Policy not found: {0}")]
    UnknownPolicy(String),

    /// Provider or downstream agent exceeded its time bound
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Every candidate in a fallback chain failed
    #[error("All routes failed for '{alias}': {last}")]
    UpstreamExhausted { alias: String, last: String },

    /// A single upstream call failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for OpenSec operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status this error is surfaced as
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::SecurityBlock(_) => StatusCode::FORBIDDEN,
            Error::UnknownModel(_) | Error::UnknownAgent(_) | Error::UnknownPolicy(_) => {
                StatusCode::NOT_FOUND
            }
            Error::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::SecurityBlock(_) => "SECURITY_BLOCK",
            Error::UnknownModel(_) | Error::UnknownAgent(_) | Error::UnknownPolicy(_) => {
                "NOT_FOUND"
            }
            Error::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            Error::UpstreamExhausted { .. } | Error::Upstream(_) => "UPSTREAM_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

impl From<&Error> for ApiError {
    fn from(err: &Error) -> Self {
        ApiError::new(err.code(), err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        }
        (status, Json(ApiError::from(&self))).into_response()
    }
}
