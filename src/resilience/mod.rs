//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt:
//!     → timeouts.rs (deadline around the transport call)
//!     → On failure: retries.rs (tagged RetryDecision)
//!         → RefreshCsrf: token refresh + fixed delay
//!         → Backoff: backoff.rs (base * 2^attempt, capped)
//!         → GiveUp: error raised to the caller
//! ```
//!
//! # Design Decisions
//! - Every network call has a deadline, even if it is 24 hours
//! - CSRF and backoff retries consume the same attempt budget

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{RetryDecision, RetryPolicy};
