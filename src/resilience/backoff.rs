//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay to wait after the zero-based `attempt` failed.
///
/// `base_ms * 2^attempt`, capped at `max_ms`, plus up to `jitter_ratio` of
/// the capped delay chosen at random.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64, jitter_ratio: f64) -> Duration {
    let exponential_base = 2u64.saturating_pow(attempt);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    let jitter_range = (capped_delay as f64 * jitter_ratio.clamp(0.0, 1.0)) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
