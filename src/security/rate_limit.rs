//! Client-side fixed-window rate limiting.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::platform::Clock;

/// Counter for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub count: u32,
    pub reset_at_ms: u64,
}

/// Snapshot of an endpoint's remaining budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// When the current window closes; `None` if no window is open.
    pub reset_at_ms: Option<u64>,
}

/// Per-endpoint fixed-window counters.
pub struct RateLimiter {
    windows: DashMap<String, RateLimitWindow>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            clock,
        }
    }

    /// Count one request against `key`. Returns false once `max_requests`
    /// have been admitted in the current window; denials leave the window as is.
    pub fn check(&self, key: &str, max_requests: u32, window: Duration) -> bool {
        if max_requests == 0 {
            return false;
        }
        let now = self.clock.now_ms();

        // The entry guard holds the shard lock for the whole read-modify-write.
        let mut entry = self.windows.entry(key.to_string()).or_insert(RateLimitWindow {
            count: 0,
            reset_at_ms: 0,
        });

        if now >= entry.reset_at_ms {
            *entry = RateLimitWindow {
                count: 1,
                reset_at_ms: now.saturating_add(window.as_millis() as u64),
            };
            return true;
        }

        if entry.count < max_requests {
            entry.count += 1;
            true
        } else {
            false
        }
    }

    pub fn status(&self, key: &str, max_requests: u32) -> RateLimitStatus {
        let now = self.clock.now_ms();
        match self.windows.get(key) {
            Some(w) if now < w.reset_at_ms => RateLimitStatus {
                limit: max_requests,
                remaining: max_requests.saturating_sub(w.count),
                reset_at_ms: Some(w.reset_at_ms),
            },
            _ => RateLimitStatus {
                limit: max_requests,
                remaining: max_requests,
                reset_at_ms: None,
            },
        }
    }

    /// Number of endpoints with a recorded window.
    pub fn tracked_endpoints(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ManualClock;

    const WINDOW: Duration = Duration::from_secs(60);

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        (RateLimiter::new(clock.clone()), clock)
    }

    #[test]
    fn test_denies_exactly_the_call_over_the_ceiling() {
        let (limiter, _) = limiter();
        let results: Vec<bool> = (0..6).map(|_| limiter.check("/courses", 5, WINDOW)).collect();
        assert_eq!(results, vec![true, true, true, true, true, false]);
    }

    #[test]
    fn test_new_window_at_reset_time() {
        let (limiter, clock) = limiter();
        for _ in 0..3 {
            assert!(limiter.check("/x", 3, WINDOW));
        }
        assert!(!limiter.check("/x", 3, WINDOW));

        clock.advance(WINDOW - Duration::from_millis(1));
        assert!(!limiter.check("/x", 3, WINDOW));

        clock.advance(Duration::from_millis(1));
        assert!(limiter.check("/x", 3, WINDOW));
    }

    #[test]
    fn test_denial_does_not_extend_window() {
        let (limiter, clock) = limiter();
        assert!(limiter.check("/x", 1, WINDOW));
        let reset = limiter.status("/x", 1).reset_at_ms.unwrap();

        clock.advance(Duration::from_secs(30));
        assert!(!limiter.check("/x", 1, WINDOW));
        assert_eq!(limiter.status("/x", 1).reset_at_ms, Some(reset));
    }

    #[test]
    fn test_endpoints_are_independent() {
        let (limiter, _) = limiter();
        assert!(limiter.check("/a", 1, WINDOW));
        assert!(!limiter.check("/a", 1, WINDOW));
        assert!(limiter.check("/b", 1, WINDOW));
        assert_eq!(limiter.tracked_endpoints(), 2);
    }

    #[test]
    fn test_status_reports_remaining() {
        let (limiter, clock) = limiter();
        assert_eq!(limiter.status("/a", 10).remaining, 10);

        limiter.check("/a", 10, WINDOW);
        limiter.check("/a", 10, WINDOW);
        let status = limiter.status("/a", 10);
        assert_eq!(status.remaining, 8);
        assert_eq!(status.reset_at_ms, Some(1_000_000 + 60_000));

        clock.advance(WINDOW);
        assert_eq!(limiter.status("/a", 10).reset_at_ms, None);
    }

    #[test]
    fn test_zero_ceiling_denies() {
        let (limiter, _) = limiter();
        assert!(!limiter.check("/a", 0, WINDOW));
    }
}
