//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or defaults
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (API_BASE_URL)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to SecurityGate / ResilientClient at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new client is built for new settings
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{config_from_env, load_config, ConfigError};
pub use schema::{
    ApiConfig, CacheConfig, ClientConfig, ObservabilityConfig, RateLimitConfig, RetryConfig,
    SecurityConfig, StorageConfig, API_BASE_URL_ENV,
};
pub use validation::{validate_config, ValidationError};
