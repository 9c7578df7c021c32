use std::time::Duration;

use crate::config::SyncSettings;

/// Exponential backoff schedule for artifact resolution.
///
/// Delay for attempt `n` is `base_delay * 1.5^n`, capped at `max_delay`.
/// Defaults match the historical client: 30s base, 1h cap, 96 attempts
/// (roughly four days of retrying before giving up).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(60 * 60),
            max_retries: 4 * 24,
        }
    }
}

impl From<&SyncSettings> for RetryPolicy {
    fn from(s: &SyncSettings) -> Self {
        Self {
            base_delay: Duration::from_secs(s.base_delay_secs),
            max_delay: Duration::from_secs(s.max_delay_secs),
            max_retries: s.max_retries,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = self.base_delay.as_secs_f64() * 1.5f64.powi(attempt as i32);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Ephemeral retry counter scoped to one resolve call. Not persisted.
#[derive(Debug)]
pub struct RetryBudget<'a> {
    policy: &'a RetryPolicy,
    attempt: u32,
}

impl<'a> RetryBudget<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Number of failures recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Record a failure; returns the delay to sleep before the next attempt,
    /// or `None` once `max_retries` failures have accumulated.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = self.policy.delay_for(self.attempt);
        self.attempt += 1;
        if self.attempt >= self.policy.max_retries {
            return None;
        }
        Some(delay)
    }
}
