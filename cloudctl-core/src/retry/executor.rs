use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cloudctl_provider::utils::log_sanitizer::truncate_for_log;
use tokio_util::sync::CancellationToken;

use super::classify::{ErrorClassifier, SubstringClassifier};
use super::policy::RetryPolicy;
use crate::error::{ClassifiedError, ErrorCategory, FailureCause, ProviderError};

/// Provider name used for errors the executor raises itself.
const EXECUTOR_NAME: &str = "cloudctl";

/// Outcome of one [`RetryExecutor::execute`] call.
#[derive(Debug, Clone)]
pub struct CallResult<T> {
    pub outcome: Result<T, ClassifiedError>,
    /// Number of times the call was actually invoked.
    pub attempts: u32,
}

impl<T> CallResult<T> {
    fn success(value: T, attempts: u32) -> Self {
        Self {
            outcome: Ok(value),
            attempts,
        }
    }

    fn failure(error: ClassifiedError, attempts: u32) -> Self {
        Self {
            outcome: Err(error),
            attempts,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        self.outcome.as_ref().err()
    }
}

/// Runs single provider calls under a [`RetryPolicy`].
///
/// Cheap to clone; one executor is shared by every call of a batch run.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    classifier: Arc<dyn ErrorClassifier>,
}

impl RetryExecutor {
    /// Create an executor using the default [`SubstringClassifier`].
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_classifier(policy, Arc::new(SubstringClassifier))
    }

    pub fn with_classifier(policy: RetryPolicy, classifier: Arc<dyn ErrorClassifier>) -> Self {
        Self { policy, classifier }
    }

    /// Invoke `f` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts.
    ///
    /// Both the attempt itself and the backoff wait race `cancel`. Once the
    /// token fires, the in-flight call is dropped and no further attempt is
    /// started, including the first one. Never panics: every failure ends up
    /// as a [`ClassifiedError`] in the returned [`CallResult`].
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        mut f: F,
    ) -> CallResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        if !self.policy.enabled {
            if cancel.is_cancelled() {
                return CallResult::failure(cancelled(operation), 0);
            }
            return match self.attempt(cancel, &mut f).await {
                Some(Ok(value)) => CallResult::success(value, 1),
                Some(Err(e)) => CallResult::failure(self.classify(operation, e), 1),
                None => CallResult::failure(cancelled(operation), 1),
            };
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.initial_delay;
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                log::debug!("[{operation}] Cancelled before attempt {}", attempt + 1);
                return CallResult::failure(cancelled(operation), attempt);
            }
            attempt += 1;
            log::debug!("[{operation}] Attempt {attempt}/{max_attempts}");

            let error = match self.attempt(cancel, &mut f).await {
                Some(Ok(value)) => {
                    if attempt > 1 {
                        log::info!("[{operation}] Succeeded after {attempt} attempts");
                    }
                    return CallResult::success(value, attempt);
                }
                Some(Err(e)) => self.classify(operation, e),
                None => {
                    log::warn!("[{operation}] Cancelled during attempt {attempt}");
                    return CallResult::failure(cancelled(operation), attempt);
                }
            };

            if !self.policy.should_retry(error.category) {
                log::debug!(
                    "[{operation}] {} error is not retryable: {}",
                    error.category,
                    truncate_for_log(&error.message)
                );
                return CallResult::failure(error, attempt);
            }

            if attempt >= max_attempts {
                log::error!(
                    "[{operation}] Failed after {max_attempts} attempts: {}",
                    truncate_for_log(&error.message)
                );
                return CallResult::failure(error, attempt);
            }

            log::warn!(
                "[{}] Request failed (attempt {}/{}), retrying in {:.1}s: {}",
                operation,
                attempt,
                max_attempts,
                delay.as_secs_f32(),
                truncate_for_log(&error.message)
            );

            tokio::select! {
                () = cancel.cancelled() => {
                    log::warn!("[{operation}] Cancelled while waiting to retry");
                    return CallResult::failure(cancelled(operation), attempt);
                }
                () = tokio::time::sleep(delay) => {}
            }
            delay = self.policy.next_delay(delay);
        }
    }

    /// One call, bounded by the attempt timeout. `None` when cancelled first.
    async fn attempt<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        f: &mut F,
    ) -> Option<Result<T, ProviderError>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let call = async {
            match self.policy.attempt_timeout {
                Some(limit) => tokio::time::timeout(limit, f())
                    .await
                    .unwrap_or_else(|_| Err(attempt_timed_out(limit))),
                None => f().await,
            }
        };
        tokio::select! {
            biased;
            result = call => Some(result),
            () = cancel.cancelled() => None,
        }
    }

    fn classify(&self, operation: &str, error: ProviderError) -> ClassifiedError {
        let message = error.to_string();
        ClassifiedError {
            category: self.classifier.classify(&message),
            operation: operation.to_string(),
            message,
            cause: FailureCause::Provider(error),
        }
    }
}

fn attempt_timed_out(limit: Duration) -> ProviderError {
    ProviderError::Timeout {
        provider: EXECUTOR_NAME.to_string(),
        detail: format!("no response within {:.1}s", limit.as_secs_f32()),
    }
}

fn cancelled(operation: &str) -> ClassifiedError {
    let cause = FailureCause::Cancelled;
    ClassifiedError {
        category: ErrorCategory::Unknown,
        operation: operation.to_string(),
        message: cause.to_string(),
        cause,
    }
}
