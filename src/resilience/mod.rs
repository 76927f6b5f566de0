//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Each API call:
//!     → timeouts.rs (one deadline for the whole call, applied per attempt)
//!     → retries.rs (classify the attempt, pick Retry-After or backoff)
//!     → backoff.rs (exponential delay, capped, optional jitter)
//! ```
//!
//! # Design Decisions
//! - Retry decisions are pure; the client owns the sleeping
//! - A timeout is final and never retried
//! - Backoff sleeps run to completion; the deadline is checked before each attempt

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{parse_retry_after, AttemptOutcome, RetryDecision, RetryPolicy};
pub use timeouts::{Deadline, Elapsed};
