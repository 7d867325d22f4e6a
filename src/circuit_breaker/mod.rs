//! Circuit breaking.
//!
//! A [`CircuitBreaker`] stops calling a task that keeps failing, giving the resource
//! behind it time to recover. The decision to let a call through is made by a
//! [`CircuitBreakerStrategy`]; [`CountStrategy`] implements the classic
//! closed / open / half-open state machine over a rolling failure window.
//!
//! Calls rejected by the strategy fail with [`CircuitOpen`] without running the
//! continuation. Panics unwinding through the breaker are not registered.

mod count;

use std::fmt;
use std::sync::Arc;

use crate::failable::Failable;
use crate::log;
use crate::policy::Policy;

pub use count::{CountStrategy, CountStrategyConfig};

/// Reported when the circuit breaker rejects a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CircuitOpen;

impl fmt::Display for CircuitOpen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit breaker is open")
    }
}

impl std::error::Error for CircuitOpen {}

/// The state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CircuitState {
    /// Calls go through; failures are counted.
    Closed,
    /// Calls are rejected until the trip duration has elapsed.
    Open,
    /// Calls go through to probe whether the resource recovered.
    HalfOpen,
}

/// Decides whether calls go through a [`CircuitBreaker`].
///
/// Strategies are shared by every call going through the breaker, possibly from
/// several threads, and must synchronize their own state.
pub trait CircuitBreakerStrategy {
    /// Returns `true` if the next call may run.
    fn allow_call(&self) -> bool;

    /// Record that a call that was allowed returned a failure.
    fn register_failure(&self);

    /// Record that a call that was allowed returned a value.
    fn register_success(&self);
}

impl<S: CircuitBreakerStrategy + ?Sized> CircuitBreakerStrategy for Arc<S> {
    fn allow_call(&self) -> bool {
        (**self).allow_call()
    }

    fn register_failure(&self) {
        (**self).register_failure()
    }

    fn register_success(&self) {
        (**self).register_success()
    }
}

impl<S: CircuitBreakerStrategy + ?Sized> CircuitBreakerStrategy for Box<S> {
    fn allow_call(&self) -> bool {
        (**self).allow_call()
    }

    fn register_failure(&self) {
        (**self).register_failure()
    }

    fn register_success(&self) {
        (**self).register_success()
    }
}

/// A policy rejecting calls while its strategy says so.
///
/// # Example
///
/// ```
/// use resilient::circuit_breaker::{CircuitOpen, CountStrategy};
/// use resilient::{CircuitBreaker, Failable, PolicyExt};
/// use std::time::Duration;
///
/// #[derive(Debug, PartialEq)]
/// enum Failure {
///     Refused,
///     Open,
/// }
///
/// impl From<CircuitOpen> for Failure {
///     fn from(_: CircuitOpen) -> Self {
///         Failure::Open
///     }
/// }
///
/// let breaker = CircuitBreaker::new(CountStrategy::new(
///     2,
///     Duration::from_secs(60),
///     Duration::from_secs(30),
///     1,
/// ));
///
/// let call = || -> Failable<(), Failure> {
///     breaker.execute(|| Failable::Failure(Failure::Refused))
/// };
/// assert_eq!(call(), Failable::Failure(Failure::Refused));
/// assert_eq!(call(), Failable::Failure(Failure::Refused));
/// // Two failures within the window: the circuit is open now.
/// assert_eq!(call(), Failable::Failure(Failure::Open));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker<S> {
    strategy: S,
}

impl<S> CircuitBreaker<S> {
    /// A circuit breaker driven by `strategy`.
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }

    /// The strategy deciding which calls go through.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }
}

impl<T, F, S> Policy<T, F> for CircuitBreaker<S>
where
    S: CircuitBreakerStrategy,
    F: From<CircuitOpen>,
{
    fn apply(&self, next: &mut dyn FnMut() -> Failable<T, F>) -> Failable<T, F> {
        if !self.strategy.allow_call() {
            log::debug!("circuit breaker rejected call");
            return Failable::Failure(F::from(CircuitOpen));
        }

        let result = next();
        if result.holds_failure() {
            self.strategy.register_failure();
        } else {
            self.strategy.register_success();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyExt;
    use parking_lot::Mutex;
    use std::panic::AssertUnwindSafe;

    /// Scripted strategy recording every registration.
    #[derive(Default)]
    struct Scripted {
        allow: bool,
        events: Mutex<Vec<&'static str>>,
    }

    impl CircuitBreakerStrategy for Scripted {
        fn allow_call(&self) -> bool {
            self.events.lock().push("allow_call");
            self.allow
        }

        fn register_failure(&self) {
            self.events.lock().push("failure");
        }

        fn register_success(&self) {
            self.events.lock().push("success");
        }
    }

    #[derive(Debug, PartialEq)]
    enum Failure {
        Task,
        Open,
    }

    impl From<CircuitOpen> for Failure {
        fn from(_: CircuitOpen) -> Self {
            Failure::Open
        }
    }

    #[test]
    fn test_rejected_call_never_runs_task() {
        let breaker = CircuitBreaker::new(Scripted::default());
        let mut ran = false;

        let result: Failable<u8, Failure> = breaker.execute(|| {
            ran = true;
            Failable::<u8, Failure>::Value(1)
        });

        assert_eq!(result, Failable::Failure(Failure::Open));
        assert!(!ran);
        assert_eq!(*breaker.strategy().events.lock(), vec!["allow_call"]);
    }

    #[test]
    fn test_outcomes_are_registered() {
        let breaker = CircuitBreaker::new(Scripted {
            allow: true,
            ..Default::default()
        });

        let value: Failable<u8, Failure> = breaker.execute(|| Failable::<u8, Failure>::Value(1));
        let failure: Failable<u8, Failure> =
            breaker.execute(|| Failable::<u8, Failure>::Failure(Failure::Task));

        assert_eq!(value, Failable::Value(1));
        assert_eq!(failure, Failable::Failure(Failure::Task));
        assert_eq!(
            *breaker.strategy().events.lock(),
            vec!["allow_call", "success", "allow_call", "failure"]
        );
    }

    #[test]
    fn test_panics_are_not_registered() {
        let breaker = CircuitBreaker::new(Scripted {
            allow: true,
            ..Default::default()
        });

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Failable<u8, Failure> =
                breaker.execute(|| -> Failable<u8, Failure> { panic!("boom") });
        }));

        assert!(outcome.is_err());
        assert_eq!(*breaker.strategy().events.lock(), vec!["allow_call"]);
    }

    #[test]
    fn test_shared_strategy_sees_every_breaker() {
        let strategy = Arc::new(Scripted {
            allow: true,
            ..Default::default()
        });
        let first = CircuitBreaker::new(Arc::clone(&strategy));
        let second = CircuitBreaker::new(Arc::clone(&strategy));

        let _: Failable<u8, Failure> = first.execute(|| Failable::<u8, Failure>::Value(1));
        let _: Failable<u8, Failure> =
            second.execute(|| Failable::<u8, Failure>::Failure(Failure::Task));

        assert_eq!(
            *strategy.events.lock(),
            vec!["allow_call", "success", "allow_call", "failure"]
        );
    }

    #[test]
    fn test_circuit_open_display() {
        assert_eq!(CircuitOpen.to_string(), "circuit breaker is open");
    }
}
