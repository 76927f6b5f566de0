//! HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → client.rs (admission, cache lookup, headers, body sanitization)
//!     → transport.rs (one attempt over reqwest, or a test double)
//!     → [resilience decides: return, retry, give up]
//!     → response.rs (error mapping or payload decoding)
//!     → cache.rs (store 200 payloads of cacheable GETs)
//!     → Caller
//! ```

pub mod cache;
pub mod client;
pub mod request;
pub mod response;
pub mod transport;

pub use cache::ResponseCache;
pub use client::{ClientBuildError, ResilientClient};
pub use request::{ApiBody, ApiRequestConfig};
pub use response::{ApiResponse, Payload};
pub use transport::{
    FilePart, MultipartForm, ReqwestTransport, Transport, TransportError, TransportRequest,
    TransportResponse,
};
