//! Reconnect budget.

use std::time::Duration;

use cairn_core::NetworkConfig;

/// Fixed-interval reconnect attempts with an attempt cap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconnectPolicy {
    /// Attempts before giving up. Zero means never retry.
    pub max_attempts: u32,
    /// Wait between attempts.
    pub backoff: Duration,
}

impl ReconnectPolicy {
    /// Builds the policy from the network section of the config.
    #[must_use]
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            max_attempts: config.reconnect_attempts,
            backoff: Duration::from_secs_f32(config.reconnect_backoff.max(0.0)),
        }
    }

    /// True if attempt number `attempt` (1-based) is within the budget.
    #[must_use]
    pub const fn allows(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(2));
        assert!(policy.allows(1));
        assert!(policy.allows(5));
        assert!(!policy.allows(6));
        assert!(!policy.allows(0));
    }

    #[test]
    fn test_zero_attempts_never_retries() {
        let policy = ReconnectPolicy {
            max_attempts: 0,
            backoff: Duration::ZERO,
        };
        assert!(!policy.allows(1));
    }
}
