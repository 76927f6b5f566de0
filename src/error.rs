//! Error taxonomy surfaced to callers of the client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ValidationError,
    RateLimited,
    InternalError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    NetworkError,
    Timeout,
    InvalidJson,
    InvalidFile,
    UnknownError,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 16] = [
        ErrorCode::BadRequest,
        ErrorCode::Unauthorized,
        ErrorCode::Forbidden,
        ErrorCode::NotFound,
        ErrorCode::Conflict,
        ErrorCode::ValidationError,
        ErrorCode::RateLimited,
        ErrorCode::InternalError,
        ErrorCode::BadGateway,
        ErrorCode::ServiceUnavailable,
        ErrorCode::GatewayTimeout,
        ErrorCode::NetworkError,
        ErrorCode::Timeout,
        ErrorCode::InvalidJson,
        ErrorCode::InvalidFile,
        ErrorCode::UnknownError,
    ];

    /// Code used when the server does not name one.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::BadRequest,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            422 => ErrorCode::ValidationError,
            429 => ErrorCode::RateLimited,
            500 => ErrorCode::InternalError,
            502 => ErrorCode::BadGateway,
            503 => ErrorCode::ServiceUnavailable,
            504 => ErrorCode::GatewayTimeout,
            _ => ErrorCode::UnknownError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::BadGateway => "BAD_GATEWAY",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::GatewayTimeout => "GATEWAY_TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InvalidJson => "INVALID_JSON",
            ErrorCode::InvalidFile => "INVALID_FILE",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the taxonomy codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error code '{0}'")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownErrorCode(s.to_string()))
    }
}

/// A terminal failure of an API call.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code} ({status}): {message}")]
pub struct ApiError {
    pub message: String,
    /// HTTP status, `0` when no response was received.
    pub status: u16,
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Rejected by client-side admission control.
    pub fn rate_limited(endpoint: &str) -> Self {
        Self::new(
            ErrorCode::RateLimited,
            429,
            format!("Too many requests to {endpoint}. Please try again later."),
        )
    }

    /// The per-call deadline elapsed before a response arrived.
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorCode::Timeout,
            408,
            format!("Request timed out after {} ms", after.as_millis()),
        )
    }

    /// No response could be obtained from the server.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, 0, message)
    }

    pub fn invalid_json(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidJson, status, message)
    }

    pub fn invalid_file(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFile, 400, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnknownError, 0, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code == ErrorCode::Unauthorized || self.status == 401
    }
}

/// Result type for client operations.
pub type ApiResult<T> = Result<T, ApiError>;
