//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → ApiClient::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; per-request overrides live on
//!   `RequestConfig`, not here
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, resolve_config, ConfigError};
pub use schema::{ApiConfig, ClientConfig, CsrfConfig, ObservabilityConfig, RetryConfig, TimeoutConfig};
pub use validation::{validate_config, ValidationError};
