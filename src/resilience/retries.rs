//! Retry decisions.
//!
//! # Responsibilities
//! - Classify each attempt's outcome as final or retryable
//! - Compute the wait before the next attempt (Retry-After or backoff)
//! - Enforce the attempt budget
//!
//! # Design Decisions
//! - Every method is retried, writes included; all attempts of one call
//!   share a single X-Request-ID
//! - 4xx other than 429 is final; the caller's request is wrong
//! - 5xx and transport failures back off exponentially
//! - 429 waits exactly Retry-After seconds when the server sends an integer

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Retry budget and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first one included. Never less than 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter_ratio: config.jitter_ratio,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
            self.jitter_ratio,
        )
    }

    /// Decide what follows the zero-based `attempt`.
    pub fn decide(&self, attempt: u32, outcome: &AttemptOutcome) -> RetryDecision {
        let has_budget = attempt + 1 < self.max_attempts;

        match *outcome {
            AttemptOutcome::Response { status, .. } if status < 400 => RetryDecision::Return,
            AttemptOutcome::Response {
                status: 429,
                retry_after,
            } => {
                if !has_budget {
                    return RetryDecision::Return;
                }
                let wait = retry_after.unwrap_or_else(|| self.backoff(attempt));
                RetryDecision::Retry {
                    after: wait,
                    reason: "rate_limited",
                }
            }
            AttemptOutcome::Response { status, .. } if status < 500 => RetryDecision::Return,
            AttemptOutcome::Response { .. } => {
                if !has_budget {
                    return RetryDecision::Return;
                }
                RetryDecision::Retry {
                    after: self.backoff(attempt),
                    reason: "server_error",
                }
            }
            AttemptOutcome::TransportFailure => {
                if !has_budget {
                    return RetryDecision::GiveUp;
                }
                RetryDecision::Retry {
                    after: self.backoff(attempt),
                    reason: "network",
                }
            }
        }
    }
}

/// What one attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Response {
        status: u16,
        /// Parsed `Retry-After`, only meaningful for 429.
        retry_after: Option<Duration>,
    },
    TransportFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Hand the response to the caller as is.
    Return,
    /// Sleep, then try again.
    Retry { after: Duration, reason: &'static str },
    /// Budget exhausted on a transport failure.
    GiveUp,
}

/// Parse a `Retry-After` header given in whole seconds. HTTP dates and
/// anything else fall back to backoff.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
