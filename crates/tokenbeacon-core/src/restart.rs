//! Restart scheduling policies for failed registration and advertising
//! attempts.
//!
//! Registration and advertising failures are never retried inline; the
//! state machine consults a [`RestartPolicy`] and emits a scheduled retry
//! command that the runtime realizes with a timer. The policy is a
//! configurable strategy rather than a hardcoded delay.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest exponent applied when computing exponential delays. Keeps the
/// shift well inside u32 range for any attempt count.
const MAX_BACKOFF_SHIFT: u32 = 16;

// ----------------------------------------------------------------------------
// Restart Policy
// ----------------------------------------------------------------------------

/// Maps a consecutive-failure count to the delay before the next attempt.
///
/// `attempt` is the number of consecutive failures observed so far and is
/// always at least 1 when the policy is consulted.
pub trait RestartPolicy: Send {
    fn delay_for(&self, attempt: u32) -> Duration;
}

/// Retry after the same delay every time.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl RestartPolicy for FixedDelay {
    fn delay_for(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Double the delay on each consecutive failure, up to a cap.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl RestartPolicy for ExponentialBackoff {
    fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        let delay = self.base.saturating_mul(1u32 << shift);
        delay.min(self.max)
    }
}

// ----------------------------------------------------------------------------
// Policy Configuration
// ----------------------------------------------------------------------------

/// Serializable selection of a restart policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestartPolicyConfig {
    /// Fixed delay between attempts.
    Fixed { delay_ms: u64 },
    /// Exponential backoff from `base_ms`, capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
}

impl Default for RestartPolicyConfig {
    fn default() -> Self {
        Self::Exponential {
            base_ms: 500,
            max_ms: 30_000,
        }
    }
}

impl RestartPolicyConfig {
    /// Build the concrete policy described by this configuration.
    pub fn build(&self) -> Box<dyn RestartPolicy> {
        match *self {
            Self::Fixed { delay_ms } => Box::new(FixedDelay::new(Duration::from_millis(delay_ms))),
            Self::Exponential { base_ms, max_ms } => Box::new(ExponentialBackoff::new(
                Duration::from_millis(base_ms),
                Duration::from_millis(max_ms),
            )),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_ignores_attempt_count() {
        let policy = FixedDelay::new(Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(17), Duration::from_millis(250));
    }

    #[test]
    fn test_exponential_backoff_doubles_and_caps() {
        let policy =
            ExponentialBackoff::new(Duration::from_millis(500), Duration::from_secs(30));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for(7), Duration::from_secs(30)); // 32s capped
        assert_eq!(policy.delay_for(100), Duration::from_secs(30));
    }

    #[test]
    fn test_policy_config_builds_matching_policy() {
        let fixed = RestartPolicyConfig::Fixed { delay_ms: 100 }.build();
        assert_eq!(fixed.delay_for(5), Duration::from_millis(100));

        let exponential = RestartPolicyConfig::default().build();
        assert_eq!(exponential.delay_for(1), Duration::from_millis(500));
        assert_eq!(exponential.delay_for(2), Duration::from_millis(1_000));
    }

    #[test]
    fn test_policy_config_serde_round_trip() {
        let config = RestartPolicyConfig::Exponential {
            base_ms: 250,
            max_ms: 10_000,
        };
        let encoded = serde_json::to_string(&config).unwrap();
        let decoded: RestartPolicyConfig = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, config);
    }
}
