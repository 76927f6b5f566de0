//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing request:
//!     → rate_limit.rs (per-endpoint fixed window, refuse before the network)
//!     → files.rs (size and extension checks for uploads)
//!     → sanitize.rs (strip scripts, dangerous schemes, control characters)
//!     → headers.rs (X-Requested-With, X-CSRF-Token, caller overrides)
//!     → Pass to transport
//!
//! Persisted state:
//!     → storage.rs (checksummed, expiring records over a KeyValueStore)
//!
//! Page-level guards:
//!     → policy.rs (CSP reports, frame embedding breakout)
//! ```
//!
//! # Design Decisions
//! - gate.rs owns every piece of mutable security state
//! - Fail closed: invalid uploads and exhausted windows never reach the network
//! - Sanitizers are pure functions over text and JSON
//! - Unreadable or tampered storage records are deleted, never returned

pub mod csrf;
pub mod files;
pub mod gate;
pub mod headers;
pub mod policy;
pub mod rate_limit;
pub mod sanitize;
pub mod storage;
pub mod types;

pub use files::{FileInfo, FileValidation, FileValidationError};
pub use gate::SecurityGate;
pub use policy::{CspViolation, PolicyViolation, ViolationRecord};
pub use rate_limit::RateLimitStatus;
pub use storage::{SecureStorage, AUTH_TOKEN_KEY, USER_DATA_KEY};
pub use types::{SecurityError, SecurityResult};
