//! Timeout enforcement.
//!
//! One deadline covers a whole call: every attempt runs under what is left
//! of it, and no new attempt starts once it has passed.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    at: Instant,
    budget: Duration,
}

/// The deadline passed before the operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            at: started + budget,
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Run `fut`, abandoning it when the deadline passes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| Elapsed(self.budget))
    }
}
