//! Reconnect backoff.
//!
//! [`ReconnectPolicy`] decides how long to wait before each reconnect
//! attempt after the channel drops, and when to give up. The session drives
//! it from `tick`; nothing here sleeps.
//!
//! # Determinism
//!
//! Delays use fixed formulas with no jitter, so replay tests see the exact
//! same schedule every run.
//!
//! # Example
//!
//! ```
//! use fairway_runtime::retry::{BackoffStrategy, ReconnectPolicy};
//! use std::time::Duration;
//!
//! let policy = ReconnectPolicy::new(4, BackoffStrategy::Exponential {
//!     base_ms: 250,
//!     max_ms: 2_000,
//! });
//!
//! assert_eq!(policy.delay(0), Duration::from_millis(250));
//! assert_eq!(policy.delay(2), Duration::from_millis(1_000));
//! assert_eq!(policy.delay(5), Duration::from_millis(2_000));
//! ```

#![forbid(unsafe_code)]

use web_time::Duration;

/// Backoff strategy between reconnect attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "strategy", rename_all = "snake_case")
)]
pub enum BackoffStrategy {
    /// Same delay every time.
    Fixed { delay_ms: u64 },
    /// `base_ms * 2^attempt`, capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
    /// `base_ms * (attempt + 1)`, capped at `max_ms`.
    Linear { base_ms: u64, max_ms: u64 },
}

/// How often and how patiently to reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ReconnectPolicy {
    /// Attempts before giving up (0 = never reconnect automatically).
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            6,
            BackoffStrategy::Exponential {
                base_ms: 500,
                max_ms: 8_000,
            },
        )
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Never reconnect automatically.
    pub fn manual() -> Self {
        Self {
            max_attempts: 0,
            backoff: BackoffStrategy::Fixed { delay_ms: 0 },
        }
    }

    /// Wait before the given attempt (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        match &self.backoff {
            BackoffStrategy::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            BackoffStrategy::Exponential { base_ms, max_ms } => {
                let multiplier = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                Duration::from_millis(base_ms.saturating_mul(multiplier).min(*max_ms))
            }
            BackoffStrategy::Linear { base_ms, max_ms } => {
                let delay = base_ms.saturating_mul(u64::from(attempt) + 1);
                Duration::from_millis(delay.min(*max_ms))
            }
        }
    }

    /// Whether another attempt is allowed after `attempts` failures.
    #[inline]
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Longest the client can spend waiting before giving up.
    pub fn total_max_delay(&self) -> Duration {
        (0..self.max_attempts).map(|i| self.delay(i)).sum()
    }

    pub(crate) fn problems(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match &self.backoff {
            BackoffStrategy::Fixed { .. } => {}
            BackoffStrategy::Exponential { base_ms, max_ms }
            | BackoffStrategy::Linear { base_ms, max_ms } => {
                if *base_ms == 0 {
                    errors.push("reconnect.backoff.base_ms must be > 0".into());
                }
                if max_ms < base_ms {
                    errors.push(format!(
                        "reconnect.backoff.max_ms ({max_ms}) must be >= base_ms ({base_ms})"
                    ));
                }
            }
        }
        errors
    }
}

/// Where the session is in its reconnect cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectState {
    Connected,
    /// Waiting `remaining` before attempt number `attempt` (0-indexed).
    Waiting { attempt: u32, remaining: Duration },
    /// The host should try to reconnect now.
    Due { attempt: u32 },
    /// Attempts exhausted; only an explicit restore recovers.
    GaveUp,
}

impl ReconnectState {
    /// Start waiting for the first attempt.
    pub fn begin(policy: &ReconnectPolicy) -> Self {
        Self::schedule(policy, 0)
    }

    fn schedule(policy: &ReconnectPolicy, attempt: u32) -> Self {
        if policy.allows(attempt) {
            Self::Waiting {
                attempt,
                remaining: policy.delay(attempt),
            }
        } else {
            Self::GaveUp
        }
    }

    /// Advance the wait. Returns `true` when an attempt just became due.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let Self::Waiting { attempt, remaining } = self else {
            return false;
        };
        if *remaining > dt {
            *remaining -= dt;
            return false;
        }
        let attempt = *attempt;
        *self = Self::Due { attempt };
        true
    }

    /// The attempt failed; wait for the next one or give up.
    pub fn failed(&mut self, policy: &ReconnectPolicy) {
        let next = match self {
            Self::Due { attempt } | Self::Waiting { attempt, .. } => attempt.saturating_add(1),
            Self::Connected | Self::GaveUp => return,
        };
        *self = Self::schedule(policy, next);
    }

    #[inline]
    pub fn is_due(&self) -> bool {
        matches!(self, Self::Due { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_is_constant() {
        let policy = ReconnectPolicy::new(3, BackoffStrategy::Fixed { delay_ms: 100 });
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(7), Duration::from_millis(100));
        assert_eq!(policy.total_max_delay(), Duration::from_millis(300));
    }

    #[test]
    fn exponential_caps_and_survives_huge_attempts() {
        let policy = ReconnectPolicy::new(
            10,
            BackoffStrategy::Exponential {
                base_ms: 100,
                max_ms: 1_000,
            },
        );
        assert_eq!(policy.delay(3), Duration::from_millis(800));
        assert_eq!(policy.delay(4), Duration::from_millis(1_000));
        assert_eq!(policy.delay(200), Duration::from_millis(1_000));
    }

    #[test]
    fn linear_grows_by_base() {
        let policy = ReconnectPolicy::new(
            5,
            BackoffStrategy::Linear {
                base_ms: 50,
                max_ms: 120,
            },
        );
        assert_eq!(policy.delay(0), Duration::from_millis(50));
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(120));
    }

    #[test]
    fn manual_policy_gives_up_immediately() {
        let policy = ReconnectPolicy::manual();
        assert_eq!(ReconnectState::begin(&policy), ReconnectState::GaveUp);
        assert_eq!(policy.total_max_delay(), Duration::ZERO);
    }

    #[test]
    fn state_walks_through_attempts() {
        let policy = ReconnectPolicy::new(2, BackoffStrategy::Fixed { delay_ms: 100 });
        let mut state = ReconnectState::begin(&policy);
        assert!(!state.tick(Duration::from_millis(60)));
        assert!(state.tick(Duration::from_millis(60)));
        assert_eq!(state, ReconnectState::Due { attempt: 0 });
        assert!(!state.tick(Duration::from_millis(500)));

        state.failed(&policy);
        assert!(matches!(state, ReconnectState::Waiting { attempt: 1, .. }));
        assert!(state.tick(Duration::from_millis(100)));
        state.failed(&policy);
        assert_eq!(state, ReconnectState::GaveUp);
    }

    #[test]
    fn bad_backoff_is_reported() {
        let policy = ReconnectPolicy::new(
            1,
            BackoffStrategy::Linear {
                base_ms: 0,
                max_ms: 0,
            },
        );
        assert_eq!(policy.problems().len(), 1);
        let inverted = ReconnectPolicy::new(
            1,
            BackoffStrategy::Exponential {
                base_ms: 10,
                max_ms: 5,
            },
        );
        assert_eq!(inverted.problems().len(), 1);
    }
}
