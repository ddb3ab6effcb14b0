use std::time::Duration;

use crate::retry::RetryPolicy;

/// Step names and tuning for the order saga.
///
/// Passed at composition time; nothing in the saga reads package-level
/// constants. The names show up in logs, metrics labels and recorded
/// outcomes, so they should stay stable across deployments.
#[derive(Debug, Clone)]
pub struct SagaConfig {
    /// Name of the reservation step.
    pub reserve_step: String,
    /// Name of the payment step.
    pub payment_step: String,
    /// Name of the compensating release step.
    pub release_step: String,
    /// Retry policy applied uniformly to every step.
    pub retry: RetryPolicy,
    /// Bound on a single step attempt.
    pub step_timeout: Duration,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            reserve_step: "reserve-stock".to_string(),
            payment_step: "process-payment".to_string(),
            release_step: "release-stock".to_string(),
            retry: RetryPolicy::default(),
            step_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_step_names() {
        let config = SagaConfig::default();
        assert_eq!(config.reserve_step, "reserve-stock");
        assert_eq!(config.payment_step, "process-payment");
        assert_eq!(config.release_step, "release-stock");
        assert_eq!(config.step_timeout, Duration::from_secs(60));
    }
}
