//! Reconnect backoff policy.
//!
//! Delays grow linearly: attempt `n` waits `unit * n`, up to the attempt cap.

use std::time::Duration;

/// Delay before reconnect attempt `attempt` (1-indexed).
///
/// Attempt 0 has no delay. Saturates instead of overflowing.
pub fn linear_delay(unit: Duration, attempt: u32) -> Duration {
    unit.checked_mul(attempt).unwrap_or(Duration::MAX)
}

/// What the supervisor should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule attempt `attempt` after `delay`.
    Retry { attempt: u32, delay: Duration },
    /// Budget used up.
    GiveUp { attempts: u32 },
}

/// Linear backoff bounded by an attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub unit: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    pub fn new(unit: Duration, max_attempts: u32) -> Self {
        Self { unit, max_attempts }
    }

    /// Decide on reconnect attempt `attempt` (the counter value after the
    /// failure has been counted).
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt > self.max_attempts {
            RetryDecision::GiveUp {
                attempts: self.max_attempts,
            }
        } else {
            RetryDecision::Retry {
                attempt,
                delay: linear_delay(self.unit, attempt),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_delay() {
        let unit = Duration::from_millis(2000);
        assert_eq!(linear_delay(unit, 0), Duration::ZERO);
        assert_eq!(linear_delay(unit, 1), Duration::from_millis(2000));
        assert_eq!(linear_delay(unit, 3), Duration::from_millis(6000));
        assert_eq!(linear_delay(unit, 5), Duration::from_millis(10_000));
    }

    #[test]
    fn test_linear_delay_saturates() {
        assert_eq!(linear_delay(Duration::MAX, 2), Duration::MAX);
    }

    #[test]
    fn test_decide_within_budget() {
        let policy = BackoffPolicy::new(Duration::from_millis(2000), 5);
        for n in 1..=5 {
            assert_eq!(
                policy.decide(n),
                RetryDecision::Retry {
                    attempt: n,
                    delay: Duration::from_millis(2000 * n as u64)
                }
            );
        }
    }

    #[test]
    fn test_decide_past_budget() {
        let policy = BackoffPolicy::new(Duration::from_millis(2000), 5);
        assert_eq!(policy.decide(6), RetryDecision::GiveUp { attempts: 5 });
    }

    #[test]
    fn test_zero_attempts_gives_up_immediately() {
        let policy = BackoffPolicy::new(Duration::from_millis(2000), 0);
        assert_eq!(policy.decide(1), RetryDecision::GiveUp { attempts: 0 });
    }
}
