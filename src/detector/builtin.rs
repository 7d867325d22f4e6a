//! Built-in detectors.

use std::any::Any as StdAny;
use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;

use super::{Detected, Detector, Outcome};

/// Failure reported by [`Always`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AlwaysFailure;

impl fmt::Display for AlwaysFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invocation treated as failed")
    }
}

impl std::error::Error for AlwaysFailure {}

/// A detector that treats every outcome as a failure.
///
/// Panics are claimed too, since no other detector is guaranteed to claim them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

/// Create an [`Always`] detector.
pub fn always() -> Always {
    Always
}

impl<T> Detector<T> for Always {
    type State = ();
    type Failure = AlwaysFailure;

    fn pre_run(&self) {}

    fn post_run(&self, _state: (), outcome: &mut Outcome<'_, T>) -> Detected<AlwaysFailure> {
        if outcome.is_panic() {
            outcome.consume_panic();
        }
        Detected::Failure(AlwaysFailure)
    }
}

/// A detector that never reports a failure.
///
/// Panics are not claimed, so they keep unwinding through the task.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

/// Create a [`Never`] detector.
pub fn never() -> Never {
    Never
}

impl<T> Detector<T> for Never {
    type State = ();
    type Failure = Infallible;

    fn pre_run(&self) {}

    fn post_run(&self, _state: (), _outcome: &mut Outcome<'_, T>) -> Detected<Infallible> {
        Detected::NoFailure
    }
}

/// Failure reported by [`Returns`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReturnedFailureValue;

impl fmt::Display for ReturnedFailureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "returned a value marked as failure")
    }
}

impl std::error::Error for ReturnedFailureValue {}

/// A detector that fails when the callable returns a specific value.
///
/// The compared value may have a different type than the returned one, as long as
/// `V: PartialEq<T>`. Panics are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Returns<V> {
    failure_value: V,
}

/// Create a [`Returns`] detector for `failure_value`.
///
/// # Example
///
/// ```
/// use resilient::detector::{returns, ReturnedFailureValue};
/// use resilient::{Failable, Task};
///
/// let task = Task::new(|s: &str| s.len(), returns(0usize));
/// assert_eq!(task.run("abc"), Failable::Value(3));
/// assert_eq!(task.run(""), Failable::Failure(ReturnedFailureValue));
/// ```
pub fn returns<V>(failure_value: V) -> Returns<V> {
    Returns { failure_value }
}

impl<V> Returns<V> {
    /// The value treated as a failure.
    pub fn failure_value(&self) -> &V {
        &self.failure_value
    }
}

impl<T, V: PartialEq<T>> Detector<T> for Returns<V> {
    type State = ();
    type Failure = ReturnedFailureValue;

    fn pre_run(&self) {}

    fn post_run(&self, _state: (), outcome: &mut Outcome<'_, T>) -> Detected<ReturnedFailureValue> {
        if !outcome.is_panic() && self.failure_value == *outcome.value() {
            Detected::Failure(ReturnedFailureValue)
        } else {
            Detected::NoFailure
        }
    }
}

/// Failure reported by [`Throws`], carrying a copy of the panic payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Thrown<P> {
    payload: P,
}

impl<P> Thrown<P> {
    /// The panic payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Take the panic payload.
    pub fn into_payload(self) -> P {
        self.payload
    }
}

impl<P: fmt::Debug> fmt::Display for Thrown<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invocation panicked with {:?}", self.payload)
    }
}

impl<P: fmt::Debug> std::error::Error for Thrown<P> {}

/// A detector that fails when the callable panics with a payload of type `P`.
///
/// Matching panics are claimed. A plain `panic!("literal")` carries a `&'static str`,
/// a formatted `panic!("{}", x)` carries a `String`, and `std::panic::panic_any(v)`
/// carries `v` itself.
pub struct Throws<P> {
    _payload: PhantomData<fn() -> P>,
}

/// Create a [`Throws`] detector for panics carrying a `P`.
pub fn throws<P>() -> Throws<P> {
    Throws {
        _payload: PhantomData,
    }
}

impl<P> Clone for Throws<P> {
    fn clone(&self) -> Self {
        throws()
    }
}

impl<P> Copy for Throws<P> {}

impl<P> Default for Throws<P> {
    fn default() -> Self {
        throws()
    }
}

impl<P> fmt::Debug for Throws<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throws")
            .field("payload", &std::any::type_name::<P>())
            .finish()
    }
}

impl<T, P: StdAny + Clone> Detector<T> for Throws<P> {
    type State = ();
    type Failure = Thrown<P>;

    fn pre_run(&self) {}

    fn post_run(&self, _state: (), outcome: &mut Outcome<'_, T>) -> Detected<Thrown<P>> {
        match outcome.downcast_payload::<P>() {
            Some(payload) => {
                let payload = payload.clone();
                outcome.consume_panic();
                Detected::Failure(Thrown { payload })
            }
            None => Detected::NoFailure,
        }
    }
}

/// A detector that classifies returned values with a closure.
///
/// The closure returns `Some(failure)` for values that represent a failure. Panics are
/// ignored. This is the natural way to classify callables returning a `Result`.
pub struct Classify<C> {
    classify: C,
}

/// Create a [`Classify`] detector.
///
/// # Example
///
/// ```
/// use resilient::detector::classify;
/// use resilient::{Failable, Task};
///
/// let task = Task::new(
///     |s: &str| s.parse::<u8>(),
///     classify(|parsed: &Result<u8, std::num::ParseIntError>| {
///         parsed.as_ref().err().map(|e| e.to_string())
///     }),
/// );
///
/// assert!(task.run("12").holds_value());
/// assert!(matches!(task.run("x"), Failable::Failure(_)));
/// ```
pub fn classify<C>(classify: C) -> Classify<C> {
    Classify { classify }
}

impl<C: Clone> Clone for Classify<C> {
    fn clone(&self) -> Self {
        classify(self.classify.clone())
    }
}

impl<C> fmt::Debug for Classify<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classify").finish_non_exhaustive()
    }
}

impl<T, F, C> Detector<T> for Classify<C>
where
    C: Fn(&T) -> Option<F>,
{
    type State = ();
    type Failure = F;

    fn pre_run(&self) {}

    fn post_run(&self, _state: (), outcome: &mut Outcome<'_, T>) -> Detected<F> {
        if outcome.is_panic() {
            return Detected::NoFailure;
        }
        (self.classify)(outcome.value()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panic_payload<P: StdAny + Send>(p: P) -> Box<dyn StdAny + Send> {
        Box::new(p)
    }

    #[test]
    fn test_always_fails_on_value() {
        let value = 1;
        let detected = always().post_run((), &mut Outcome::returned(&value));
        assert_eq!(detected, Detected::Failure(AlwaysFailure));
    }

    #[test]
    fn test_always_claims_panics() {
        let payload = panic_payload("x");
        let mut outcome = Outcome::<()>::panicked(&*payload);
        let detected = always().post_run((), &mut outcome);
        assert!(detected.is_failure());
        assert!(outcome.is_consumed());
    }

    #[test]
    fn test_never_leaves_panics_alone() {
        let payload = panic_payload("x");
        let mut outcome = Outcome::<()>::panicked(&*payload);
        let detected = never().post_run((), &mut outcome);
        assert_eq!(detected, Detected::NoFailure);
        assert!(!outcome.is_consumed());
    }

    #[test]
    fn test_returns_matches_value() {
        let detector = returns(-1);
        assert_eq!(
            detector.post_run((), &mut Outcome::returned(&-1)),
            Detected::Failure(ReturnedFailureValue)
        );
        assert_eq!(
            detector.post_run((), &mut Outcome::returned(&4)),
            Detected::NoFailure
        );
    }

    #[test]
    fn test_returns_compares_across_types() {
        let detector = returns("");
        let value = String::new();
        assert!(detector
            .post_run((), &mut Outcome::returned(&value))
            .is_failure());
    }

    #[test]
    fn test_returns_ignores_panics() {
        let payload = panic_payload(0);
        let mut outcome = Outcome::<i32>::panicked(&*payload);
        assert_eq!(returns(0).post_run((), &mut outcome), Detected::NoFailure);
        assert!(!outcome.is_consumed());
    }

    #[test]
    fn test_throws_matches_payload_type() {
        let payload = panic_payload(String::from("db down"));
        let mut outcome = Outcome::<()>::panicked(&*payload);
        let detected = throws::<String>().post_run((), &mut outcome);
        assert_eq!(
            detected.into_option().map(Thrown::into_payload),
            Some("db down".to_string())
        );
        assert!(outcome.is_consumed());
    }

    #[test]
    fn test_throws_ignores_other_payloads() {
        let payload = panic_payload(42u8);
        let mut outcome = Outcome::<()>::panicked(&*payload);
        assert_eq!(
            throws::<String>().post_run((), &mut outcome),
            Detected::NoFailure
        );
        assert!(!outcome.is_consumed());

        let value = ();
        assert_eq!(
            throws::<String>().post_run((), &mut Outcome::returned(&value)),
            Detected::NoFailure
        );
    }

    #[test]
    fn test_classify_maps_values() {
        let detector = classify(|code: &u16| (*code >= 500).then_some(*code));
        assert_eq!(
            detector.post_run((), &mut Outcome::returned(&503)),
            Detected::Failure(503)
        );
        assert_eq!(
            detector.post_run((), &mut Outcome::returned(&200)),
            Detected::NoFailure
        );
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(AlwaysFailure.to_string(), "invocation treated as failed");
        let thrown = Thrown { payload: "oops" };
        assert!(thrown.to_string().contains("oops"));
    }
}
