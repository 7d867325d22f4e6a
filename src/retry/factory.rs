//! Generic retry state factories.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{RetryDecision, RetryState, RetryStateFactory};

/// Hands out a clone of a template state for every job.
///
/// ```
/// use resilient::retry::{CloneStateFactory, RetryTimes};
/// use resilient::Retry;
///
/// let retry = Retry::new(CloneStateFactory::new(RetryTimes::new(2)));
/// # let _ = retry;
/// ```
#[derive(Debug, Clone)]
pub struct CloneStateFactory<S> {
    template: S,
}

impl<S> CloneStateFactory<S> {
    /// A factory cloning `template`.
    pub fn new(template: S) -> Self {
        Self { template }
    }

    /// The state every job starts from.
    pub fn template(&self) -> &S {
        &self.template
    }
}

impl<F, S> RetryStateFactory<F> for CloneStateFactory<S>
where
    S: RetryState<F> + Clone,
{
    type State = S;

    fn get_retry_state(&self) -> S {
        self.template.clone()
    }
}

/// Builds the state of every job with a closure.
pub struct FnStateFactory<G> {
    build: G,
}

impl<G> FnStateFactory<G> {
    /// A factory calling `build` for every job.
    pub fn new(build: G) -> Self {
        Self { build }
    }
}

impl<G: Clone> Clone for FnStateFactory<G> {
    fn clone(&self) -> Self {
        Self::new(self.build.clone())
    }
}

impl<G> fmt::Debug for FnStateFactory<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStateFactory").finish_non_exhaustive()
    }
}

impl<F, S, G> RetryStateFactory<F> for FnStateFactory<G>
where
    G: Fn() -> S,
    S: RetryState<F>,
{
    type State = S;

    fn get_retry_state(&self) -> S {
        (self.build)()
    }
}

/// Hands every job the same state, owned jointly with the caller.
///
/// Jobs draw from one retry budget, and the caller can inspect the state once they
/// are done. The lock is taken for each `failed_with` and `should_retry` call only,
/// never while a job runs or sleeps.
///
/// ```
/// use resilient::detector::{returns, ReturnedFailureValue};
/// use resilient::retry::{NoMoreRetriesLeft, RetryTimes, SharedStateFactory};
/// use resilient::{Failable, PolicyExt, Retry, Task};
///
/// #[derive(Debug, PartialEq)]
/// enum Failure {
///     Empty,
///     GaveUp,
/// }
///
/// impl From<ReturnedFailureValue> for Failure {
///     fn from(_: ReturnedFailureValue) -> Self {
///         Failure::Empty
///     }
/// }
///
/// impl From<NoMoreRetriesLeft> for Failure {
///     fn from(_: NoMoreRetriesLeft) -> Self {
///         Failure::GaveUp
///     }
/// }
///
/// let budget = SharedStateFactory::new(RetryTimes::new(2));
/// let retry = Retry::new(budget.clone());
/// let task = Task::new(|s: &str| s.len(), returns(0usize));
///
/// let result: Failable<usize, Failure> = retry.execute(|| task.run(""));
/// assert_eq!(result, Failable::Failure(Failure::GaveUp));
/// assert_eq!(budget.lock().retries_left(), 0);
/// ```
#[derive(Debug)]
pub struct SharedStateFactory<S> {
    state: Arc<Mutex<S>>,
}

impl<S> SharedStateFactory<S> {
    /// A factory sharing `state` between all jobs.
    pub fn new(state: S) -> Self {
        Self::from_shared(Arc::new(Mutex::new(state)))
    }

    /// A factory sharing a state the caller already holds.
    pub fn from_shared(state: Arc<Mutex<S>>) -> Self {
        Self { state }
    }

    /// The shared state.
    pub fn shared(&self) -> &Arc<Mutex<S>> {
        &self.state
    }

    /// Lock the shared state for inspection.
    pub fn lock(&self) -> parking_lot::MutexGuard<'_, S> {
        self.state.lock()
    }
}

impl<S> Clone for SharedStateFactory<S> {
    fn clone(&self) -> Self {
        Self::from_shared(Arc::clone(&self.state))
    }
}

impl<F, S> RetryStateFactory<F> for SharedStateFactory<S>
where
    S: RetryState<F>,
{
    type State = SharedState<S>;

    fn get_retry_state(&self) -> SharedState<S> {
        SharedState {
            state: Arc::clone(&self.state),
        }
    }
}

/// Handle to the state of a [`SharedStateFactory`], forwarding to it under its lock.
#[derive(Debug)]
pub struct SharedState<S> {
    state: Arc<Mutex<S>>,
}

impl<F, S> RetryState<F> for SharedState<S>
where
    S: RetryState<F>,
{
    type Stop = S::Stop;

    fn failed_with(&mut self, failure: F) {
        self.state.lock().failed_with(failure);
    }

    fn should_retry(&mut self) -> RetryDecision<S::Stop> {
        self.state.lock().should_retry()
    }
}
