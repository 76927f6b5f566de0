//! Client metrics.
//!
//! # Metrics
//! - `client_requests_total` (counter): completed calls by method, status
//! - `client_request_duration_seconds` (histogram): end-to-end call latency, retries included
//! - `client_retries_total` (counter): retry attempts by reason
//! - `client_rate_limited_total` (counter): calls refused by the local limiter
//! - `client_cache_events_total` (counter): response cache hits and misses
//! - `client_storage_invalidations_total` (counter): discarded storage records or files by reason
//! - `client_policy_violations_total` (counter): CSP and framing violations by kind
//!
//! Status `0` means the call never got a response (network failure or timeout).

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!("client_requests_total", "Total API calls by method and final status");
    describe_histogram!(
        "client_request_duration_seconds",
        "API call duration in seconds, including retries"
    );
    describe_counter!("client_retries_total", "Retry attempts by reason");
    describe_counter!("client_rate_limited_total", "Calls refused by the client-side rate limiter");
    describe_counter!("client_cache_events_total", "Response cache lookups by result");
    describe_counter!(
        "client_storage_invalidations_total",
        "Storage records or files discarded by reason"
    );
    describe_counter!("client_policy_violations_total", "Policy violations by kind");
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "client_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("client_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// `reason` is one of `server_error`, `rate_limited`, `network`.
pub fn record_retry(reason: &'static str) {
    counter!("client_retries_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited() {
    counter!("client_rate_limited_total").increment(1);
}

pub fn record_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("client_cache_events_total", "result" => result).increment(1);
}

pub fn record_storage_invalidated(reason: &'static str) {
    counter!("client_storage_invalidations_total", "reason" => reason).increment(1);
}

pub fn record_policy_violation(kind: &'static str) {
    counter!("client_policy_violations_total", "kind" => kind).increment(1);
}
