//! Exponential backoff with optional jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before retrying after the failed attempt `attempt` (0-based).
///
/// `base * 2^attempt`, capped at `max`. With `jitter`, up to 10% of the
/// capped delay is added on top.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration, jitter: bool) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);

    let exponential_base = 2u64.saturating_pow(attempt);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    let jitter_range = if jitter { capped_delay / 10 } else { 0 };
    let jitter_ms = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay.saturating_add(jitter_ms))
}
