//! Failure kinds reported by the retry policy.

use std::time::Duration;

/// Reported by [`RetryTimes`](super::RetryTimes) once every allowed retry was used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoMoreRetriesLeft;

impl std::fmt::Display for NoMoreRetriesLeft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no more retries left")
    }
}

impl std::error::Error for NoMoreRetriesLeft {}

/// Reported by [`Backoff`](super::Backoff) when its policy allows no further attempt.
///
/// Carries metadata about the retry sequence. The failure of the final attempt is not
/// kept: the retry policy replaces it with this value.
///
/// # Examples
///
/// ```rust
/// use resilient::retry::{BackoffPolicy, RetryExhausted};
/// use resilient::{Failable, PolicyExt, Retry};
/// use std::time::Duration;
///
/// #[derive(Debug, PartialEq)]
/// enum Failure {
///     Timeout,
///     Exhausted(RetryExhausted),
/// }
///
/// impl From<RetryExhausted> for Failure {
///     fn from(exhausted: RetryExhausted) -> Self {
///         Failure::Exhausted(exhausted)
///     }
/// }
///
/// let retry = Retry::backoff(
///     BackoffPolicy::constant(Duration::from_millis(1)).with_max_retries(2),
/// );
///
/// let mut attempts = 0;
/// let result: Failable<(), Failure> = retry.execute(|| {
///     attempts += 1;
///     Failable::<(), Failure>::Failure(Failure::Timeout)
/// });
///
/// match result {
///     Failable::Failure(Failure::Exhausted(exhausted)) => {
///         assert_eq!(exhausted.attempts, 3); // 1 initial + 2 retries
///     }
///     other => panic!("unexpected {:?}", other),
/// }
/// assert_eq!(attempts, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryExhausted {
    /// Total number of attempts made (initial + retries).
    pub attempts: u32,
    /// Time elapsed between the start of the first attempt and giving up.
    pub total_duration: Duration,
}

impl RetryExhausted {
    /// Create a new RetryExhausted failure.
    pub fn new(attempts: u32, total_duration: Duration) -> Self {
        Self {
            attempts,
            total_duration,
        }
    }
}

impl std::fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "retry exhausted after {} attempts ({:?})",
            self.attempts, self.total_duration
        )
    }
}

impl std::error::Error for RetryExhausted {}
