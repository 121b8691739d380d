use std::time::Duration;

use rand::Rng;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds. Expiry counts as "no response".
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded retry schedule for Core requests.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub retries: usize,
    /// Delay before the first retry, in milliseconds.
    pub min_timeout_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_timeout_ms: u64,
    /// Multiplier applied per retry.
    pub factor: f64,
    /// Scale each delay by a random factor in `[1, 2)`.
    pub randomize: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            min_timeout_ms: 200,
            max_timeout_ms: 400,
            factor: 1.0,
            randomize: true,
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> usize {
        self.retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (zero-based), scaled by `jitter`.
    pub fn delay_with_jitter(&self, retry: usize, jitter: f64) -> Duration {
        let exp = retry.min(32) as i32;
        let raw = jitter * self.min_timeout_ms as f64 * self.factor.powi(exp);
        let capped = raw.min(self.max_timeout_ms as f64).max(0.0);
        Duration::from_millis(capped.round() as u64)
    }

    /// Delay before retry number `retry`, drawing jitter when `randomize` is set.
    pub fn delay_for(&self, retry: usize) -> Duration {
        let jitter = if self.randomize {
            rand::thread_rng().gen_range(1.0..2.0)
        } else {
            1.0
        };
        self.delay_with_jitter(retry, jitter)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::RetryPolicy;

    #[test]
    fn default_allows_four_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 4);
    }

    #[test]
    fn delay_grows_by_factor_and_caps_at_max() {
        let policy = RetryPolicy {
            retries: 5,
            min_timeout_ms: 100,
            max_timeout_ms: 1_000,
            factor: 2.0,
            randomize: false,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(1_000));
    }

    #[test]
    fn randomized_delay_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for retry in 0..policy.retries {
            for _ in 0..50 {
                let delay = policy.delay_for(retry);
                assert!(delay >= Duration::from_millis(200), "{delay:?}");
                assert!(delay <= Duration::from_millis(400), "{delay:?}");
            }
        }
    }
}
