use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff with jitter.
///
/// Delay for attempt `n` (zero-indexed) is `initial * factor^n`, capped at `max_delay`, with
/// up to 10% random jitter added so co-operating callers do not retry in lockstep.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retrying the provided zero-indexed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay.as_secs_f64() * self.factor.powi(attempt as i32);
        let capped = exp.min(self.max_delay.as_secs_f64());
        let jitter = rand::rng().random_range(0.0..capped * 0.1);
        Duration::from_secs_f64(capped + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_delay_grows_exponentially() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            factor: 2.0,
        };

        // Jitter adds at most 10%, so attempt boundaries stay ordered
        assert!(policy.delay(0) >= Duration::from_millis(100));
        assert!(policy.delay(0) < Duration::from_millis(111));
        assert!(policy.delay(2) >= Duration::from_millis(400));
        assert!(policy.delay(2) < Duration::from_millis(441));
    }

    #[test]
    fn test_retry_policy_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            factor: 10.0,
        };

        assert!(policy.delay(9) <= Duration::from_secs_f64(4.4));
    }
}
