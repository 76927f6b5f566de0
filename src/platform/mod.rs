//! Platform abstraction subsystem.
//!
//! # Data Flow
//! ```text
//! SecurityGate / ResilientClient
//!     → clock.rs   (epoch milliseconds for windows, TTLs, cache expiry)
//!     → random.rs  (CSRF token bytes)
//!     → store.rs   (raw key-value persistence: memory or JSON file)
//!     → context.rs (browsing context for frame-embedding checks)
//! ```
//!
//! # Design Decisions
//! - Every environment primitive sits behind a small trait so the pipeline
//!   runs the same under tests, CLIs and embedded hosts
//! - `Platform::default()` wires the process-local adapters

pub mod clock;
pub mod context;
pub mod random;
pub mod store;

use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{BrowsingContext, HeadlessContext};
pub use random::{OsRandom, RandomSource};
pub use store::{FileStore, KeyValueStore, MemoryStore, StorageError};

/// The set of platform adapters a [`SecurityGate`](crate::security::SecurityGate) runs on.
#[derive(Clone)]
pub struct Platform {
    pub store: Arc<dyn KeyValueStore>,
    pub random: Arc<dyn RandomSource>,
    pub clock: Arc<dyn Clock>,
    pub context: Arc<dyn BrowsingContext>,
    /// CSRF token embedded by the hosting page, if any.
    pub embedded_csrf_token: Option<String>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            random: Arc::new(OsRandom),
            clock: Arc::new(SystemClock),
            context: Arc::new(HeadlessContext),
            embedded_csrf_token: None,
        }
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("embedded_csrf_token", &self.embedded_csrf_token.is_some())
            .finish_non_exhaustive()
    }
}
