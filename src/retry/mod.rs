//! Retrying tasks that fail transiently.
//!
//! [`Retry`] runs its continuation until it returns a value or a retry state decides
//! to stop. Each job gets its own [`RetryState`], handed out by a
//! [`RetryStateFactory`] and returned to it once the job is over, whatever the exit
//! path (value, stop or panic).
//!
//! # Quick Start
//!
//! ```rust
//! use resilient::detector::{throws, Thrown};
//! use resilient::retry::{BackoffPolicy, RetryExhausted};
//! use resilient::{Failable, PolicyExt, Retry, Task};
//! use std::cell::Cell;
//! use std::time::Duration;
//!
//! #[derive(Debug, PartialEq)]
//! enum Failure {
//!     Crashed,
//!     Exhausted(RetryExhausted),
//! }
//!
//! impl From<Thrown<&'static str>> for Failure {
//!     fn from(_: Thrown<&'static str>) -> Self {
//!         Failure::Crashed
//!     }
//! }
//!
//! impl From<RetryExhausted> for Failure {
//!     fn from(exhausted: RetryExhausted) -> Self {
//!         Failure::Exhausted(exhausted)
//!     }
//! }
//!
//! let calls = Cell::new(0);
//! let flaky = Task::new(
//!     |_: ()| {
//!         calls.set(calls.get() + 1);
//!         if calls.get() < 3 {
//!             panic!("flaky")
//!         }
//!         "done"
//!     },
//!     throws::<&'static str>(),
//! );
//!
//! // Exponential backoff: 1ms, 2ms, 4ms, then give up
//! let retry = Retry::backoff(
//!     BackoffPolicy::exponential(Duration::from_millis(1)).with_max_retries(3),
//! );
//!
//! # let hook = std::panic::take_hook();
//! # std::panic::set_hook(Box::new(|_| {}));
//! let result: Failable<_, Failure> = retry.execute(|| flaky.run(()));
//! # std::panic::set_hook(hook);
//! assert_eq!(result, Failable::Value("done"));
//! assert_eq!(calls.get(), 3);
//! ```
//!
//! # Retry States
//!
//! - [`RetryTimes`]: retry a fixed number of times, then stop with [`NoMoreRetriesLeft`]
//! - [`AlwaysRetry`]: retry forever
//! - [`Backoff`]: wait between attempts following a [`BackoffPolicy`], then stop with
//!   [`RetryExhausted`]
//! - [`KeepLastFailure`]: wrap another state to stop with the last failure seen
//!
//! Factories decide which state a job gets: [`CloneStateFactory`] clones a template,
//! [`FnStateFactory`] builds one with a closure, [`BackoffFactory`] starts a fresh
//! [`Backoff`], and [`SharedStateFactory`] hands every job the same state so they
//! share one retry budget.
//!
//! # Backoff Curves
//!
//! - **Constant**: Fixed delay between retries
//! - **Linear**: Delay increases linearly (100ms, 200ms, 300ms, ...)
//! - **Exponential**: Delay doubles each retry (100ms, 200ms, 400ms, ...)
//! - **Fibonacci**: Delay follows Fibonacci sequence
//!
//! # Jitter Support
//!
//! Jitter adds randomness to delays to prevent thundering herd problems.
//! Enable the `jitter` feature to use jitter:
//!
//! ```toml
//! resilient = { version = "...", features = ["jitter"] }
//! ```
//!
//! # Failures
//!
//! Once the state stops, the failure returned is the state's stop value, converted into
//! the pipeline failure type. The failure of the last attempt is handed to the state
//! through [`RetryState::failed_with`] and is otherwise dropped.

mod backoff;
mod error;
mod factory;
mod state;

use std::marker::PhantomData;
use std::thread;
use std::time::Duration;

use crate::failable::Failable;
use crate::log;
use crate::policy::Policy;

pub use backoff::{Backoff, BackoffCurve, BackoffFactory, BackoffPolicy, JitterStrategy};
pub use error::{NoMoreRetriesLeft, RetryExhausted};
pub use factory::{CloneStateFactory, FnStateFactory, SharedState, SharedStateFactory};
pub use state::{AlwaysRetry, KeepLastFailure, RetryTimes};

/// What a retry state wants to happen after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision<S> {
    /// Run the task again after waiting for the given duration.
    RetryAfter(Duration),
    /// Give up, reporting the given value as the failure.
    Stop(S),
}

/// Tracks the attempts of one job and decides whether to retry it.
pub trait RetryState<F> {
    /// Reported when the state gives up.
    type Stop;

    /// Record the failure of the last attempt.
    fn failed_with(&mut self, failure: F);

    /// Decide what to do after the failure recorded last.
    fn should_retry(&mut self) -> RetryDecision<Self::Stop>;
}

/// Hands out a [`RetryState`] for each job.
pub trait RetryStateFactory<F> {
    /// The states handed out.
    type State: RetryState<F>;

    /// Get the state for a new job.
    fn get_retry_state(&self) -> Self::State;

    /// Take back the state of a finished job.
    ///
    /// Called exactly once per state handed out, after the last attempt, including when
    /// the job panics.
    fn return_retry_state(&self, state: Self::State) {
        let _ = state;
    }
}

/// A policy retrying its continuation while it fails.
///
/// The first attempt always runs. After each failed attempt the job's retry state is
/// told about the failure and asked whether to retry; the calling thread sleeps for the
/// requested delay, if any, before the next attempt. Attempts never overlap.
#[derive(Debug, Clone)]
pub struct Retry<Fac> {
    factory: Fac,
}

impl<Fac> Retry<Fac> {
    /// A retry policy using `factory` to get a state per job.
    pub fn new(factory: Fac) -> Self {
        Self { factory }
    }

    /// The factory handing out retry states.
    pub fn factory(&self) -> &Fac {
        &self.factory
    }
}

impl Retry<CloneStateFactory<RetryTimes>> {
    /// Retry up to `retries` times, then fail with [`NoMoreRetriesLeft`].
    pub fn times(retries: u32) -> Self {
        Self::new(CloneStateFactory::new(RetryTimes::new(retries)))
    }

    /// Never retry: the first failure becomes [`NoMoreRetriesLeft`].
    pub fn never() -> Self {
        Self::new(CloneStateFactory::new(RetryTimes::never()))
    }
}

impl Retry<CloneStateFactory<AlwaysRetry>> {
    /// Retry until the continuation returns a value.
    ///
    /// The pipeline failure type must implement `From<Infallible>`.
    pub fn always() -> Self {
        Self::new(CloneStateFactory::new(AlwaysRetry))
    }
}

impl Retry<BackoffFactory> {
    /// Retry following `policy`, then fail with [`RetryExhausted`].
    pub fn backoff(policy: BackoffPolicy) -> Self {
        Self::new(BackoffFactory::new(policy))
    }
}

/// Gives the state back to its factory when dropped.
struct StateGuard<'a, F, Fac: RetryStateFactory<F>> {
    factory: &'a Fac,
    state: Option<Fac::State>,
    _failure: PhantomData<fn(F)>,
}

impl<'a, F, Fac: RetryStateFactory<F>> StateGuard<'a, F, Fac> {
    fn acquire(factory: &'a Fac) -> Self {
        Self {
            factory,
            state: Some(factory.get_retry_state()),
            _failure: PhantomData,
        }
    }

    fn state_mut(&mut self) -> &mut Fac::State {
        match self.state.as_mut() {
            Some(state) => state,
            None => unreachable!("retry state is only taken when the guard drops"),
        }
    }
}

impl<F, Fac: RetryStateFactory<F>> Drop for StateGuard<'_, F, Fac> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.factory.return_retry_state(state);
        }
    }
}

impl<T, F, Fac> Policy<T, F> for Retry<Fac>
where
    Fac: RetryStateFactory<F>,
    F: From<<Fac::State as RetryState<F>>::Stop>,
{
    fn apply(&self, next: &mut dyn FnMut() -> Failable<T, F>) -> Failable<T, F> {
        let mut guard = StateGuard::acquire(&self.factory);

        loop {
            let failure = match next() {
                Failable::Value(value) => return Failable::Value(value),
                Failable::Failure(failure) => failure,
            };

            let state = guard.state_mut();
            state.failed_with(failure);
            match state.should_retry() {
                RetryDecision::RetryAfter(delay) => {
                    log::debug!(delay = ?delay, "attempt failed, retrying");
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                RetryDecision::Stop(stop) => {
                    log::debug!("attempt failed, no more retries");
                    return Failable::Failure(F::from(stop));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
