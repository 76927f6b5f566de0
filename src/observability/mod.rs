//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Client pipeline and security gate produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → Whatever tracing subscriber the host installs (init_logging for the CLI)
//!     → Whatever metrics recorder the host installs (none by default)
//! ```
//!
//! # Design Decisions
//! - Every request carries an X-Request-ID that is logged on each attempt
//! - Metrics are no-ops until a recorder is installed
//! - No exporter ships with the client; the embedding application picks one

pub mod logging;
pub mod metrics;
