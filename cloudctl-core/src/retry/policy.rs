use std::time::Duration;

use crate::error::{CoreError, CoreResult, ErrorCategory};

/// Factor applied to the backoff delay after every failed attempt.
pub const BACKOFF_MULTIPLIER: u32 = 2;

/// Which failures are worth another attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryOn {
    /// Retry every failure regardless of category.
    #[default]
    AllErrors,
    /// Retry only categories where a retry can plausibly succeed
    /// (see [`ErrorCategory::is_transient`]).
    TransientOnly,
}

/// Retry configuration shared read-only by every call in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// When `false`, each call is made exactly once.
    pub enabled: bool,
    /// Total attempts including the first one. Must be at least 1.
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    pub retry_on: RetryOn,
    /// Per-attempt time limit. An attempt that exceeds it fails as a timeout.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            retry_on: RetryOn::AllErrors,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Check the policy's bounds.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_attempts == 0 {
            return Err(CoreError::InvalidPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(CoreError::InvalidPolicy(format!(
                "initial_delay ({:?}) exceeds max_delay ({:?})",
                self.initial_delay, self.max_delay
            )));
        }
        if self.attempt_timeout == Some(Duration::ZERO) {
            return Err(CoreError::InvalidPolicy(
                "attempt_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay to use after waiting `current`: doubled, capped at `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current
            .saturating_mul(BACKOFF_MULTIPLIER)
            .min(self.max_delay)
    }

    /// Whether a failure of `category` may be retried under this policy.
    pub fn should_retry(&self, category: ErrorCategory) -> bool {
        match self.retry_on {
            RetryOn::AllErrors => true,
            RetryOn::TransientOnly => category.is_transient(),
        }
    }
}
