use std::time::Duration;

/// Uniform retry policy applied to every saga step.
///
/// Delays grow exponentially from `initial_interval` by
/// `backoff_multiplier` per attempt, capped at `max_interval`; the step is
/// abandoned after `max_attempts` attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay.
    pub max_interval: Duration,
    /// Total attempt budget, including the first attempt.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(100),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay to sleep after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis =
            self.initial_interval.as_millis() as f64 * self.backoff_multiplier.powi(exponent);

        let delay = Duration::from_millis(millis as u64);
        delay.min(self.max_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_step_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_secs(1));
        assert_eq!(policy.backoff_multiplier, 2.0);
        assert_eq!(policy.max_interval, Duration::from_secs(100));
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(8));
    }

    #[test]
    fn delay_caps_at_max_interval() {
        let policy = RetryPolicy::default();
        // 2^9 = 512s, well past the 100s cap.
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(100));
    }

    #[test]
    fn custom_multiplier_applies() {
        let policy = RetryPolicy {
            initial_interval: Duration::from_millis(100),
            backoff_multiplier: 3.0,
            max_interval: Duration::from_secs(10),
            max_attempts: 5,
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(900));
    }
}
