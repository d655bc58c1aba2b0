//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before retry number `attempt` (1-based).
///
/// Doubles from `min` on each attempt, capped at `max`, plus up to 10%
/// jitter that never pushes the delay past `max`.
pub fn calculate_backoff(attempt: u32, min: Duration, max: Duration) -> Duration {
    if attempt == 0 || max.is_zero() {
        return Duration::ZERO;
    }

    let min_ms = min.as_millis() as u64;
    let max_ms = max.as_millis() as u64;

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = min_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = (capped_delay / 10).min(max_ms - capped_delay);
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
