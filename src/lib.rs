//! Security and resilience layer for outbound API calls.
//!
//! A [`SecurityGate`] owns the client-side security state (CSRF token, rate
//! limit windows, checksummed storage, policy violations). A
//! [`ResilientClient`] runs every call through the gate, retries transient
//! failures under one deadline, caches idempotent reads and maps failures
//! onto the [`ErrorCode`] taxonomy.

pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod platform;
pub mod resilience;
pub mod security;

pub use config::ClientConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use http::{ApiRequestConfig, ApiResponse, Payload, ResilientClient};
pub use platform::Platform;
pub use security::SecurityGate;
