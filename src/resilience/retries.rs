//! Retry decisions.
//!
//! # Responsibilities
//! - Decide, per failed attempt, whether and how to retry
//! - Share one attempt budget between CSRF recovery and backoff retries
//!
//! # Design Decisions
//! - CSRF mismatch is retried after a token refresh and a fixed delay
//! - Network, timeout and unexpected transport failures back off exponentially
//! - HTTP status failures, malformed bodies and rejected requests never retry

use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{ErrorKind, TransportError};
use crate::resilience::backoff::calculate_backoff;

/// What the executor does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Clear and refresh the CSRF token, wait `delay`, retry.
    RefreshCsrf { delay: Duration },
    /// Wait the backoff delay, retry.
    Backoff(Duration),
    /// Raise the error to the caller.
    GiveUp,
}

/// Failure kinds presumed to succeed on an unmodified retry.
pub fn is_transient(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::Network | ErrorKind::Timeout | ErrorKind::Unexpected)
}

/// Retry settings for one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included.
    pub attempts: u32,
    pub delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            attempts: config.max_attempts,
            delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }

    /// Decide what follows the failure of attempt `attempt` (0-based).
    pub fn decide(&self, error: &TransportError, attempt: u32) -> RetryDecision {
        if attempt.saturating_add(1) >= self.attempts {
            return RetryDecision::GiveUp;
        }
        match error.kind() {
            ErrorKind::CsrfMismatch => RetryDecision::RefreshCsrf { delay: self.delay },
            kind if is_transient(kind) => {
                RetryDecision::Backoff(calculate_backoff(attempt, self.delay, self.max_delay, self.jitter))
            }
            _ => RetryDecision::GiveUp,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
