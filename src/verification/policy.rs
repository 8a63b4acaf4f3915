//! Polling schedule for a verification session.

use std::time::Duration;

use crate::config::schema::{PollingConfig, PollingOverrides};

/// Timing and budget for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    /// Wait before the first query.
    pub settle_delay: Duration,
    /// Wait between the end of one attempt and the start of the next.
    pub poll_interval: Duration,
    /// Total time budget the query count is derived from.
    pub timeout: Duration,
    /// Maximum number of queries per session.
    pub max_attempts: u32,
    /// Upper bound on a single attempt; exceeding it counts as a transient error.
    pub attempt_timeout: Duration,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl PollingPolicy {
    /// Build the global policy from configuration.
    pub fn from_config(config: &PollingConfig) -> Self {
        let poll_interval = Duration::from_millis(config.poll_interval_ms);
        let timeout = Duration::from_secs(config.timeout_secs);
        Self {
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            poll_interval,
            timeout,
            max_attempts: config
                .max_attempts
                .unwrap_or_else(|| attempts_for_budget(timeout, poll_interval))
                .max(1),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
        }
    }

    /// Apply per-network overrides on top of this policy.
    ///
    /// An overridden interval or timeout re-derives the budget unless
    /// `max_attempts` is overridden as well.
    pub fn with_overrides(&self, overrides: &PollingOverrides) -> Self {
        let mut policy = *self;
        if let Some(ms) = overrides.settle_delay_ms {
            policy.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.poll_interval_ms {
            policy.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = overrides.timeout_secs {
            policy.timeout = Duration::from_secs(secs);
        }

        policy.max_attempts = match overrides.max_attempts {
            Some(max) => max,
            None if overrides.poll_interval_ms.is_some() || overrides.timeout_secs.is_some() => {
                attempts_for_budget(policy.timeout, policy.poll_interval)
            }
            None => self.max_attempts,
        };
        policy.max_attempts = policy.max_attempts.max(1);
        policy
    }
}

/// Number of queries that fit in `budget` at `interval` spacing, at least one.
pub fn attempts_for_budget(budget: Duration, interval: Duration) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    let attempts = budget.as_millis().div_ceil(interval_ms);
    u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_36_attempts() {
        let policy = PollingPolicy::default();
        assert_eq!(policy.settle_delay, Duration::from_secs(2));
        assert_eq!(policy.poll_interval, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 36);
    }

    #[test]
    fn test_budget_rounds_up() {
        assert_eq!(
            attempts_for_budget(Duration::from_secs(10), Duration::from_secs(3)),
            4
        );
        assert_eq!(
            attempts_for_budget(Duration::from_millis(1), Duration::from_secs(5)),
            1
        );
        assert_eq!(attempts_for_budget(Duration::ZERO, Duration::from_secs(5)), 1);
    }

    #[test]
    fn test_explicit_max_attempts_wins() {
        let config = PollingConfig {
            max_attempts: Some(3),
            ..PollingConfig::default()
        };
        assert_eq!(PollingPolicy::from_config(&config).max_attempts, 3);
    }

    #[test]
    fn test_overrides() {
        let base = PollingPolicy::from_config(&PollingConfig::default());

        let faster = base.with_overrides(&PollingOverrides {
            poll_interval_ms: Some(1_000),
            ..PollingOverrides::default()
        });
        assert_eq!(faster.poll_interval, Duration::from_secs(1));
        assert_eq!(faster.max_attempts, 180);
        assert_eq!(faster.settle_delay, base.settle_delay);

        let capped = base.with_overrides(&PollingOverrides {
            poll_interval_ms: Some(1_000),
            max_attempts: Some(5),
            ..PollingOverrides::default()
        });
        assert_eq!(capped.max_attempts, 5);

        let unchanged = base.with_overrides(&PollingOverrides::default());
        assert_eq!(unchanged, base);
    }
}
