use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use futures_retry_policies::ShouldRetry;
use futures_retry_policies::retry_policies::RetryPolicies;
use futures_retry_policies::tokio::RetryFutureExt;
use retry_policies::policies::ExponentialBackoff;
use storage::repository::StorageError;

/// A storage error tagged with whether another try may help.
#[derive(Debug)]
pub enum MaybeRetry<T> {
    MaybeRetry(T),
    NoRetry(T),
}

impl<T> MaybeRetry<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::MaybeRetry(inner) | Self::NoRetry(inner) => inner,
        }
    }
}

impl<T> ShouldRetry for MaybeRetry<T> {
    fn should_retry(&self, _: u32) -> bool {
        match self {
            Self::MaybeRetry(_) => true,
            Self::NoRetry(_) => false,
        }
    }
}

impl From<StorageError> for MaybeRetry<StorageError> {
    fn from(err: StorageError) -> Self {
        if err.is_transient() {
            Self::MaybeRetry(err)
        } else {
            Self::NoRetry(err)
        }
    }
}

/// Logs each scheduled retry before handing the decision back.
struct LoggedRetry<P> {
    operation: &'static str,
    inner: P,
}

impl<R, E, P> futures_retry_policies::RetryPolicy<Result<R, MaybeRetry<E>>> for LoggedRetry<P>
where
    E: std::fmt::Display,
    P: futures_retry_policies::RetryPolicy<Result<R, MaybeRetry<E>>>,
{
    fn should_retry(
        &mut self,
        result: Result<R, MaybeRetry<E>>,
    ) -> ControlFlow<Result<R, MaybeRetry<E>>, Duration> {
        let error = result.as_ref().err().map(|err| match err {
            MaybeRetry::MaybeRetry(inner) | MaybeRetry::NoRetry(inner) => inner.to_string(),
        });
        let decision = self.inner.should_retry(result);
        if let (ControlFlow::Continue(delay), Some(error)) = (&decision, error) {
            tracing::warn!(
                operation = self.operation,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "transient storage failure, retrying"
            );
        }
        decision
    }
}

/// Bounded exponential backoff for storage writes.
///
/// Only transient failures (`StorageError::Unavailable`) are retried; a
/// rejected write fails immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; values below 1 are raised to 1.
    /// `max_delay` is raised to `initial_delay` if smaller.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }

    /// Single try, no retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .retry_bounds(self.initial_delay, self.max_delay)
            .build_with_max_retries(self.max_attempts - 1)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the last `StorageError` produced by `op`.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        if self.max_attempts <= 1 {
            return op().await;
        }

        let policy = LoggedRetry {
            operation,
            inner: RetryPolicies::new(self.backoff()),
        };
        let attempt = move || {
            let fut = op();
            async move { fut.await.map_err(MaybeRetry::from) }
        };
        attempt.retry(policy).await.map_err(MaybeRetry::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts(), 1);
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }

    #[test]
    fn storage_errors_are_tagged_by_kind() {
        assert!(MaybeRetry::from(StorageError::Unavailable("locked".into())).should_retry(0));
        assert!(!MaybeRetry::from(StorageError::WriteRejected("dup".into())).should_retry(0));
        assert!(!MaybeRetry::from(StorageError::NotFound).should_retry(0));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(40));
        let mut calls = 0;
        let result = policy
            .run("save", || {
                calls += 1;
                let n = calls;
                async move {
                    if n < 3 {
                        Err(StorageError::Unavailable("locked".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10), Duration::from_millis(10));
        let mut calls = 0;
        let result: Result<(), _> = policy
            .run("save", || {
                calls += 1;
                async { Err(StorageError::Unavailable("down".into())) }
            })
            .await;

        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn rejected_writes_are_not_retried() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result: Result<(), _> = policy
            .run("save", || {
                calls += 1;
                async { Err(StorageError::WriteRejected("duplicate".into())) }
            })
            .await;

        assert!(matches!(result, Err(StorageError::WriteRejected(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn single_attempt_policy_does_not_retry() {
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::none()
            .run("save", || {
                calls += 1;
                async { Err(StorageError::Unavailable("down".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
