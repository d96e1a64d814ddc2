//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is 1-based; attempt 0 yields no delay.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = (attempt - 1).min(31);
    let capped_delay = base.saturating_mul(1u32 << exponent).min(max);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay.as_millis() as u64 / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    capped_delay + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let base = Duration::from_millis(100);

        let b1 = calculate_backoff(1, base, Duration::from_secs(2));
        assert!(b1 >= Duration::from_millis(100) && b1 < Duration::from_millis(110));

        let b2 = calculate_backoff(2, base, Duration::from_secs(2));
        assert!(b2 >= Duration::from_millis(200));

        let max = calculate_backoff(10, base, Duration::from_secs(1));
        assert!(max >= Duration::from_secs(1) && max < Duration::from_millis(1100));

        assert_eq!(calculate_backoff(0, base, Duration::from_secs(1)), Duration::ZERO);
        // Large attempt counts must not overflow.
        assert!(calculate_backoff(u32::MAX, base, Duration::from_secs(60)) >= Duration::from_secs(60));
    }
}
