//! Reference retry states.

use std::convert::Infallible;
use std::time::Duration;

use super::{NoMoreRetriesLeft, RetryDecision, RetryState};

/// Retries a fixed number of times, without waiting.
///
/// Failures are not inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTimes {
    retries_left: u32,
}

impl RetryTimes {
    /// Allow `retries` retries after the first attempt.
    pub fn new(retries: u32) -> Self {
        Self {
            retries_left: retries,
        }
    }

    /// Allow no retry at all.
    pub fn never() -> Self {
        Self::new(0)
    }

    /// Retries still allowed.
    pub fn retries_left(&self) -> u32 {
        self.retries_left
    }
}

impl<F> RetryState<F> for RetryTimes {
    type Stop = NoMoreRetriesLeft;

    fn failed_with(&mut self, _failure: F) {}

    fn should_retry(&mut self) -> RetryDecision<NoMoreRetriesLeft> {
        if self.retries_left == 0 {
            return RetryDecision::Stop(NoMoreRetriesLeft);
        }
        self.retries_left -= 1;
        RetryDecision::RetryAfter(Duration::ZERO)
    }
}

/// Retries forever, without waiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysRetry;

impl<F> RetryState<F> for AlwaysRetry {
    type Stop = Infallible;

    fn failed_with(&mut self, _failure: F) {}

    fn should_retry(&mut self) -> RetryDecision<Infallible> {
        RetryDecision::RetryAfter(Duration::ZERO)
    }
}

/// Wraps a retry state so that giving up reports the failure of the last attempt.
///
/// The wrapped state still decides when to stop; its own stop value is only reported
/// if no failure was recorded.
///
/// ```
/// use resilient::retry::{CloneStateFactory, KeepLastFailure, NoMoreRetriesLeft, RetryTimes};
/// use resilient::{Failable, PolicyExt, Retry};
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Failure {
///     Attempt(u32),
///     NoMoreRetries,
/// }
///
/// impl From<NoMoreRetriesLeft> for Failure {
///     fn from(_: NoMoreRetriesLeft) -> Self {
///         Failure::NoMoreRetries
///     }
/// }
///
/// let retry = Retry::new(CloneStateFactory::new(KeepLastFailure::new(RetryTimes::new(2))));
///
/// let mut attempt = 0;
/// let result: Failable<(), Failure> = retry.execute(|| {
///     attempt += 1;
///     Failable::<(), Failure>::Failure(Failure::Attempt(attempt))
/// });
/// assert_eq!(result, Failable::Failure(Failure::Attempt(3)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepLastFailure<S, F> {
    inner: S,
    last: Option<F>,
}

impl<S, F> KeepLastFailure<S, F> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner, last: None }
    }

    /// The wrapped state.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The failure of the last attempt, if any failed yet.
    pub fn last_failure(&self) -> Option<&F> {
        self.last.as_ref()
    }
}

impl<S, F> RetryState<F> for KeepLastFailure<S, F>
where
    S: RetryState<F>,
    F: Clone + From<S::Stop>,
{
    type Stop = F;

    fn failed_with(&mut self, failure: F) {
        self.inner.failed_with(failure.clone());
        self.last = Some(failure);
    }

    fn should_retry(&mut self) -> RetryDecision<F> {
        match self.inner.should_retry() {
            RetryDecision::RetryAfter(delay) => RetryDecision::RetryAfter(delay),
            RetryDecision::Stop(stop) => {
                RetryDecision::Stop(self.last.take().unwrap_or_else(|| F::from(stop)))
            }
        }
    }
}
