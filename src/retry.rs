//! Bounded exponential-backoff retry for transient remote failures.
//!
//! Every network operation in this crate runs through
//! [`retry_with_backoff`]: on failure the wrapper waits `base_delay · 2^i`
//! (attempt index `i` starting at 0, capped at `max_delay`) and tries again,
//! up to [`RetryPolicy::max_attempts`] attempts total. The final failure is
//! propagated to the caller unmodified.
//!
//! Failures carry an [`ErrorKind`] produced where the raw transport error is
//! first observed. Rate-limited failures are retried with the same schedule
//! as other transient failures; the classification exists so they can be
//! logged distinctly and so callers can steer users to the remote service's
//! own viewer when throttling persists.
//!
//! # Example
//!
//! ```no_run
//! use gallery_core::retry::{RetryPolicy, retry_with_backoff};
//! # use gallery_core::drive::{DriveClient, ListQuery};
//! # async fn example(client: &DriveClient) -> Result<(), gallery_core::drive::FetchError> {
//! let policy = RetryPolicy::default();
//! let page = retry_with_backoff(&policy, || async {
//!     client.list_children(&ListQuery::children_of("folder-id").images()).await
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Default maximum attempts (including the initial attempt).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for the first retry (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Classification of a remote failure.
///
/// Produced at the transport boundary (see
/// [`FetchError`](crate::drive::FetchError)); retry and reporting logic
/// switch on this closed set instead of matching message substrings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Temporary failure (connectivity, timeout, non-2xx response) that may
    /// succeed on retry.
    Transient,

    /// The remote service reported too many requests (HTTP 429). Retried
    /// like any transient failure, logged distinctly.
    RateLimited,
}

/// Implemented by error types the retrier can classify for logging.
pub trait Classify {
    /// The kind of this failure.
    fn kind(&self) -> ErrorKind;
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `base_delay`: 1 second
/// - `max_delay`: 32 seconds
///
/// # Delay Calculation
///
/// ```text
/// delay before retry i = min(base_delay * 2^i, max_delay)    (i = 0, 1, ...)
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Delay cap.
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy with custom settings.
    ///
    /// `max_attempts` is clamped to at least 1 (the initial attempt always
    /// runs).
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for the
    /// delays.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay to wait after the failure of attempt
    /// `attempt_index` (0-indexed): `base_delay * 2^attempt_index`, capped
    /// at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let factor = 1u64.checked_shl(attempt_index).unwrap_or(u64::MAX);
        let delay_ms = base_ms.saturating_mul(factor);
        let cap_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(delay_ms.min(cap_ms))
    }
}

/// Runs `op`, retrying failures with exponential backoff per `policy`.
///
/// The wrapper owns no shared state: each invocation has its own attempt
/// counter, so it is safe to use concurrently from any number of call
/// sites. The error of the final attempt is returned unmodified.
///
/// # Errors
///
/// Returns the last error produced by `op` once `policy.max_attempts()`
/// attempts have failed.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Classify + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts() {
                    warn!(error = %err, attempts = attempt, "giving up after final attempt");
                    return Err(err);
                }
                let delay = policy.delay_for(attempt - 1);
                match err.kind() {
                    ErrorKind::RateLimited => warn!(
                        error = %err,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    ),
                    ErrorKind::Transient => debug!(
                        error = %err,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, retrying"
                    ),
                }
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug)]
    struct TestError(ErrorKind);

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error ({:?})", self.0)
        }
    }

    impl Classify for TestError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(8))
    }

    #[test]
    fn test_default_policy_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    }

    #[test]
    fn test_max_attempts_minimum_is_one() {
        assert_eq!(RetryPolicy::with_max_attempts(0).max_attempts(), 1);
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(32));
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_respects_cap() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(6), Duration::from_secs(5));
        // Shift amounts past the counter width saturate instead of wrapping.
        assert_eq!(policy.delay_for(200), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = retry_with_backoff(&fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_persistent_failure_attempts_exactly_max() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = retry_with_backoff(&fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError(ErrorKind::Transient)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_after_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, TestError> = retry_with_backoff(&fast_policy(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(TestError(ErrorKind::Transient))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limited_is_retried_like_transient() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = retry_with_backoff(&fast_policy(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError(ErrorKind::RateLimited)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_invocations_are_independent() {
        let policy = fast_policy(2);
        let first = retry_with_backoff(&policy, || async { Ok::<_, TestError>(1) });
        let second = retry_with_backoff(&policy, || async { Ok::<_, TestError>(2) });
        let (a, b) = tokio::join!(first, second);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
    }
}
