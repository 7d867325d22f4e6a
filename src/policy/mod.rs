//! The policy protocol.
//!
//! A [`Policy`] wraps the execution of a continuation returning a
//! [`Failable`]. It may run the continuation once, several times, or not at all, and
//! may replace its result with a failure of its own. Policies are combined with a
//! [`Pipeline`].
//!
//! # Failure types
//!
//! A policy is typed over the caller's failure type `F`, usually an enum listing
//! every kind the task and the policies can report. A policy that fails on its own
//! account requires `F: From<ItsFailure>`; the task's failure enters through
//! [`PolicyExt::execute`], which accepts any `E: Into<F>`.
//!
//! # Example
//!
//! ```
//! use resilient::detector::{returns, ReturnedFailureValue};
//! use resilient::retry::NoMoreRetriesLeft;
//! use resilient::{Failable, Pipeline, PolicyExt, Retry, Task};
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! #[derive(Debug, PartialEq)]
//! enum Failure {
//!     Zero,
//!     GaveUp,
//! }
//!
//! impl From<ReturnedFailureValue> for Failure {
//!     fn from(_: ReturnedFailureValue) -> Self {
//!         Failure::Zero
//!     }
//! }
//!
//! impl From<NoMoreRetriesLeft> for Failure {
//!     fn from(_: NoMoreRetriesLeft) -> Self {
//!         Failure::GaveUp
//!     }
//! }
//!
//! let calls = AtomicU32::new(0);
//! let task = Task::new(|_: ()| calls.fetch_add(1, Ordering::SeqCst), returns(0u32));
//! let pipeline = Pipeline::<u32, Failure>::new().then(Retry::times(2));
//!
//! assert_eq!(pipeline.execute(|| task.run(())), Failable::Value(1));
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! ```

mod pipeline;

use std::sync::Arc;

use crate::failable::Failable;

pub use pipeline::Pipeline;

/// A strategy wrapping the execution of a continuation.
///
/// `next` runs the rest of the pipeline, ending with the task. Implementations must
/// not call it concurrently with itself.
pub trait Policy<T, F> {
    /// Run `next` under this policy.
    fn apply(&self, next: &mut dyn FnMut() -> Failable<T, F>) -> Failable<T, F>;
}

/// Entry point for running a callable under a policy.
///
/// Blanket-implemented for every [`Policy`].
pub trait PolicyExt<T, F>: Policy<T, F> {
    /// Run `callable` under this policy, widening its failure into `F`.
    fn execute<C, E>(&self, mut callable: C) -> Failable<T, F>
    where
        C: FnMut() -> Failable<T, E>,
        E: Into<F>,
    {
        self.apply(&mut || -> Failable<T, F> { callable().widen() })
    }
}

impl<T, F, P: Policy<T, F> + ?Sized> PolicyExt<T, F> for P {}

impl<T, F, P: Policy<T, F> + ?Sized> Policy<T, F> for Arc<P> {
    fn apply(&self, next: &mut dyn FnMut() -> Failable<T, F>) -> Failable<T, F> {
        (**self).apply(next)
    }
}

impl<T, F, P: Policy<T, F> + ?Sized> Policy<T, F> for Box<P> {
    fn apply(&self, next: &mut dyn FnMut() -> Failable<T, F>) -> Failable<T, F> {
        (**self).apply(next)
    }
}

/// A policy that runs the continuation once and returns its result unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl<T, F> Policy<T, F> for Noop {
    fn apply(&self, next: &mut dyn FnMut() -> Failable<T, F>) -> Failable<T, F> {
        next()
    }
}
