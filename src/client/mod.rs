//! API client subsystem.
//!
//! # Data Flow
//! ```text
//! get/post/put/patch/delete/head (api.rs)
//!     → RequestConfig
//!     → executor.rs: resolve URL, validate
//!         → per attempt: CSRF token → headers → body → transport (timeout)
//!         → failure: RetryDecision → refresh / back off / give up
//!     → decoded payload, or one TransportError
//! ```

mod api;
pub mod executor;

pub use executor::{ApiClient, ApiClientBuilder, EXHAUSTED_MESSAGE};
