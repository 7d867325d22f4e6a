//! Binding a callable to a detector.
//!
//! A [`Task`] runs a callable, lets its [`Detector`] classify what happened, and
//! produces a [`Failable`]:
//!
//! | callable            | detector                   | `run` result                  |
//! |---------------------|----------------------------|-------------------------------|
//! | returns `v`         | no failure                 | `Failable::Value(v)`          |
//! | returns `v`         | failure `f`                | `Failable::Failure(f)`        |
//! | panics              | does not claim the panic   | the panic is resumed          |
//! | panics              | claims it, failure `f`     | `Failable::Failure(f)`        |
//! | panics              | claims it, no failure      | [`UnknownTaskResult`] panic   |
//!
//! Panics nobody claimed keep unwinding with their original payload, past every
//! policy wrapping the task.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::detector::{Detected, Detector, Outcome};
use crate::failable::Failable;
use crate::log;

/// Raised (as a panic payload) when a detector claims a panic without reporting a
/// failure.
///
/// This is a bug in the detector, not a failure of the task: there is neither a value
/// nor a failure to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnknownTaskResult;

impl fmt::Display for UnknownTaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task panicked and the panic was claimed, but no failure was detected"
        )
    }
}

impl std::error::Error for UnknownTaskResult {}

/// A callable together with the detector classifying its outcomes.
///
/// The callable takes a single argument; pass several values as a tuple and `()` for
/// none.
///
/// # Example
///
/// ```
/// use resilient::detector::{returns, ReturnedFailureValue};
/// use resilient::{Failable, Task};
///
/// let divide = Task::new(|(a, b): (i32, i32)| a.checked_div(b), returns(None));
///
/// assert_eq!(divide.run((6, 3)), Failable::Value(Some(2)));
/// assert_eq!(divide.run((1, 0)), Failable::Failure(ReturnedFailureValue));
/// ```
pub struct Task<C, D> {
    callable: C,
    detector: D,
}

impl<C, D> Task<C, D> {
    /// Bind `callable` to `detector`.
    pub fn new(callable: C, detector: D) -> Self {
        Self { callable, detector }
    }

    /// The detector classifying this task's outcomes.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Invoke the callable with `args` and classify the outcome.
    ///
    /// # Panics
    ///
    /// Resumes the callable's panic if the detector did not claim it, and panics with
    /// [`UnknownTaskResult`] if the detector claimed it without reporting a failure.
    pub fn run<A, T>(&self, args: A) -> Failable<T, D::Failure>
    where
        C: Fn(A) -> T,
        D: Detector<T>,
    {
        let state = self.detector.pre_run();

        match panic::catch_unwind(AssertUnwindSafe(|| (self.callable)(args))) {
            Ok(value) => {
                let detected = self
                    .detector
                    .post_run(state, &mut Outcome::returned(&value));
                match detected {
                    Detected::NoFailure => Failable::Value(value),
                    Detected::Failure(failure) => Failable::Failure(failure),
                }
            }
            Err(payload) => {
                let mut outcome = Outcome::panicked(&*payload);
                let detected = self.detector.post_run(state, &mut outcome);

                if !outcome.is_consumed() {
                    log::debug!(
                        message = ?outcome.panic_message(),
                        "resuming unclaimed task panic"
                    );
                    panic::resume_unwind(payload);
                }

                match detected {
                    Detected::Failure(failure) => {
                        log::trace!(
                            message = ?outcome.panic_message(),
                            "task panic claimed as failure"
                        );
                        Failable::Failure(failure)
                    }
                    Detected::NoFailure => {
                        log::error!(
                            message = ?outcome.panic_message(),
                            "detector claimed a panic without reporting a failure"
                        );
                        panic::panic_any(UnknownTaskResult)
                    }
                }
            }
        }
    }
}

impl<C, D: Clone> Clone for Task<C, D>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self::new(self.callable.clone(), self.detector.clone())
    }
}

impl<C, D: fmt::Debug> fmt::Debug for Task<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("callable", &std::any::type_name::<C>())
            .field("detector", &self.detector)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{always, never, returns, throws, AlwaysFailure, Detector, Thrown};
    use std::cell::Cell;

    #[derive(Debug, PartialEq, Clone)]
    struct Crash(u32);

    #[test]
    fn test_value_passes_through_never() {
        let task = Task::new(|x: u32| x * 2, never());
        assert_eq!(task.run(21), Failable::Value(42));
    }

    #[test]
    fn test_detected_value_becomes_failure() {
        let task = Task::new(|x: i32| x - 1, returns(0));
        assert_eq!(task.run(1).into_failure(), crate::detector::ReturnedFailureValue);
        assert_eq!(task.run(5), Failable::Value(4));
    }

    #[test]
    fn test_claimed_panic_becomes_failure() {
        let task = Task::new(
            |code: u32| -> u32 { std::panic::panic_any(Crash(code)) },
            throws::<Crash>(),
        );
        let failure = task.run(7).into_failure();
        assert_eq!(failure.payload(), &Crash(7));
    }

    #[test]
    fn test_unclaimed_panic_is_resumed_unchanged() {
        let task = Task::new(
            |_: ()| -> u32 { std::panic::panic_any(Crash(3)) },
            throws::<String>(),
        );

        let payload = std::panic::catch_unwind(AssertUnwindSafe(|| task.run(())))
            .expect_err("panic should propagate");
        assert_eq!(payload.downcast_ref::<Crash>(), Some(&Crash(3)));
    }

    struct ClaimsWithoutFailure;

    impl Detector<u32> for ClaimsWithoutFailure {
        type State = ();
        type Failure = AlwaysFailure;

        fn pre_run(&self) {}

        fn post_run(&self, _: (), outcome: &mut Outcome<'_, u32>) -> Detected<AlwaysFailure> {
            if outcome.is_panic() {
                outcome.consume_panic();
            }
            Detected::NoFailure
        }
    }

    #[test]
    fn test_claim_without_failure_is_unknown_result() {
        let task = Task::new(|_: ()| -> u32 { panic!("lost") }, ClaimsWithoutFailure);

        let payload = std::panic::catch_unwind(AssertUnwindSafe(|| task.run(())))
            .expect_err("contract violation should panic");
        assert!(payload.is::<UnknownTaskResult>());
    }

    struct CountingDetector {
        pre: Cell<u32>,
        post: Cell<u32>,
    }

    impl Detector<u32> for CountingDetector {
        type State = u32;
        type Failure = AlwaysFailure;

        fn pre_run(&self) -> u32 {
            self.pre.set(self.pre.get() + 1);
            self.pre.get()
        }

        fn post_run(&self, state: u32, _: &mut Outcome<'_, u32>) -> Detected<AlwaysFailure> {
            assert_eq!(state, self.pre.get());
            self.post.set(self.post.get() + 1);
            Detected::NoFailure
        }
    }

    #[test]
    fn test_state_flows_from_pre_to_post_run() {
        let task = Task::new(
            |x: u32| x,
            CountingDetector {
                pre: Cell::new(0),
                post: Cell::new(0),
            },
        );
        task.run(1);
        task.run(2);
        assert_eq!(task.detector().pre.get(), 2);
        assert_eq!(task.detector().post.get(), 2);
    }

    #[test]
    fn test_always_fails_even_on_panic() {
        let task = Task::new(|_: ()| -> u8 { panic!("x") }, always());
        assert_eq!(task.run(()), Failable::Failure(AlwaysFailure));
    }

    #[test]
    fn test_thrown_payload_is_formatted_message() {
        let task = Task::new(|n: u8| -> u8 { panic!("bad input {}", n) }, throws::<String>());
        let failure: Thrown<String> = task.run(9).into_failure();
        assert_eq!(failure.payload(), "bad input 9");
    }

    #[test]
    fn test_debug_names_callable_type() {
        let task = Task::new(|x: u8| x, never());
        let debug = format!("{:?}", task);
        assert!(debug.contains("Task"));
        assert!(debug.contains("Never"));
    }
}
