//! Failure detection.
//!
//! A [`Detector`] classifies the outcome of a single invocation, either a returned
//! value or a panic, into "no failure" or one of the failure kinds it declares through
//! its `Failure` type. Detection happens in two steps around the invocation:
//!
//! 1. [`pre_run`](Detector::pre_run) prepares whatever per-invocation state the detector
//!    needs (a start time, a counter snapshot, ...);
//! 2. [`post_run`](Detector::post_run) receives that state and the [`Outcome`] and
//!    returns a [`Detected`].
//!
//! # Built-in detectors
//!
//! - [`Always`]: every outcome is a failure
//! - [`Never`]: no outcome is a failure
//! - [`Returns`]: the callable returned a specific value
//! - [`Throws`]: the callable panicked with a payload of a specific type
//! - [`Classify`]: a closure maps the returned value to an optional failure
//!
//! Several detectors are combined with [`any_of`]; the first one (in declaration
//! order) that detects a failure decides the reported kind.
//!
//! # Example
//!
//! ```
//! use resilient::detector::{any_of, returns, throws, ReturnedFailureValue, Thrown};
//! use resilient::{Failable, Task};
//!
//! #[derive(Debug, PartialEq)]
//! enum Failure {
//!     Zero,
//!     Crashed(&'static str),
//! }
//!
//! impl From<ReturnedFailureValue> for Failure {
//!     fn from(_: ReturnedFailureValue) -> Self {
//!         Failure::Zero
//!     }
//! }
//!
//! impl From<Thrown<&'static str>> for Failure {
//!     fn from(thrown: Thrown<&'static str>) -> Self {
//!         Failure::Crashed(thrown.into_payload())
//!     }
//! }
//!
//! let task = Task::new(
//!     |n: i32| if n < 0 { panic!("negative") } else { n % 3 },
//!     any_of::<Failure, _>((returns(0), throws::<&'static str>())),
//! );
//!
//! assert_eq!(task.run(4), Failable::Value(1));
//! assert_eq!(task.run(3), Failable::Failure(Failure::Zero));
//! # let hook = std::panic::take_hook();
//! # std::panic::set_hook(Box::new(|_| {}));
//! assert_eq!(task.run(-1), Failable::Failure(Failure::Crashed("negative")));
//! # std::panic::set_hook(hook);
//! ```

mod any;
mod builtin;
mod outcome;

pub use any::{any_of, Any};
pub use builtin::{
    always, classify, never, returns, throws, Always, AlwaysFailure, Classify, Never, Returns,
    ReturnedFailureValue, Throws, Thrown,
};
pub use outcome::Outcome;

/// Classifies the outcome of invoking a callable returning `T`.
///
/// Implementations declare the failure kinds they can report through `Failure`
/// (typically an enum, or a single struct for a single kind).
///
/// # Panics handling
///
/// When the callable panicked, `post_run` may call [`Outcome::consume_panic`] to claim
/// it. A claimed panic must be reported as a failure: claiming a panic and returning
/// [`Detected::NoFailure`] is a contract violation that the [`Task`](crate::Task) turns
/// into an [`UnknownTaskResult`](crate::task::UnknownTaskResult) panic.
pub trait Detector<T> {
    /// Per-invocation state threaded from `pre_run` to `post_run`.
    type State;
    /// The failure kinds this detector reports.
    type Failure;

    /// Prepare for one invocation.
    fn pre_run(&self) -> Self::State;

    /// Classify what happened during the invocation.
    fn post_run(&self, state: Self::State, outcome: &mut Outcome<'_, T>)
        -> Detected<Self::Failure>;
}

/// The result of classifying an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detected<F> {
    /// Nothing went wrong.
    NoFailure,
    /// A failure of one of the detector's declared kinds.
    Failure(F),
}

impl<F> Detected<F> {
    /// Returns `true` if a failure was detected.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Detected::Failure(_))
    }

    /// Transform the detected failure.
    #[inline]
    pub fn map<G, M>(self, f: M) -> Detected<G>
    where
        M: FnOnce(F) -> G,
    {
        match self {
            Detected::NoFailure => Detected::NoFailure,
            Detected::Failure(failure) => Detected::Failure(f(failure)),
        }
    }

    /// Keep `self` if it is a failure, otherwise take `later`.
    ///
    /// Used to combine detections in declaration order: the earliest failure wins.
    #[inline]
    pub fn or(self, later: Detected<F>) -> Detected<F> {
        match self {
            Detected::Failure(failure) => Detected::Failure(failure),
            Detected::NoFailure => later,
        }
    }

    /// Convert into an `Option`, `None` meaning no failure.
    #[inline]
    pub fn into_option(self) -> Option<F> {
        match self {
            Detected::NoFailure => None,
            Detected::Failure(failure) => Some(failure),
        }
    }
}

impl<F> From<Option<F>> for Detected<F> {
    fn from(option: Option<F>) -> Self {
        match option {
            Some(failure) => Detected::Failure(failure),
            None => Detected::NoFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_keeps_first_failure() {
        let first: Detected<u8> = Detected::Failure(1);
        assert_eq!(first.or(Detected::Failure(2)), Detected::Failure(1));
        assert_eq!(Detected::NoFailure.or(Detected::Failure(2)), Detected::Failure(2));
        assert_eq!(Detected::<u8>::NoFailure.or(Detected::NoFailure), Detected::NoFailure);
    }

    #[test]
    fn test_option_conversions() {
        assert_eq!(Detected::from(Some(3)), Detected::Failure(3));
        assert_eq!(Detected::<i32>::from(None), Detected::NoFailure);
        assert_eq!(Detected::Failure(3).into_option(), Some(3));
    }

    #[test]
    fn test_map_only_touches_failures() {
        assert_eq!(Detected::Failure(2).map(|x| x * 2), Detected::Failure(4));
        assert_eq!(Detected::<i32>::NoFailure.map(|x| x * 2), Detected::NoFailure);
        assert!(!Detected::<()>::NoFailure.is_failure());
    }
}
