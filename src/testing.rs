//! Testing utilities for code built on resilient
//!
//! This module provides a manually driven clock for time-dependent strategies,
//! assertion macros for [`Failable`](crate::Failable) results, and property-based
//! testing support.
//!
//! # Examples
//!
//! ## Manual Clock
//!
//! ```rust
//! use resilient::circuit_breaker::{CircuitBreakerStrategy, CountStrategy, CountStrategyConfig};
//! use resilient::testing::ManualClock;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let breaker = CountStrategy::with_clock(
//!     CountStrategyConfig::default()
//!         .with_failure_threshold(1)
//!         .with_trip_duration(Duration::from_secs(30)),
//!     clock.clone(),
//! );
//!
//! breaker.register_failure();
//! assert!(!breaker.allow_call());
//!
//! clock.advance(Duration::from_secs(30));
//! assert!(breaker.allow_call());
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use resilient::{assert_failed_with, assert_failure, assert_value, Failable};
//!
//! let value = Failable::<_, String>::value(42);
//! assert_value!(value);
//!
//! let failure = Failable::<i32, _>::failure("timeout");
//! assert_failure!(failure);
//! assert_failed_with!(failure, "timeout");
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::Clock;

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give another to the
/// strategy under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// A clock frozen at the current instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// A clock frozen at `instant`.
    pub fn starting_at(instant: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(instant)),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now += duration;
    }

    /// Move the clock to `instant`.
    pub fn set(&self, instant: Instant) {
        *self.now.lock() = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Assert that a failable holds a value.
///
/// This macro will panic if the failable holds a failure.
///
/// # Example
///
/// ```rust
/// use resilient::{assert_value, Failable};
///
/// let result = Failable::<_, String>::value(42);
/// assert_value!(result);
/// ```
#[macro_export]
macro_rules! assert_value {
    ($failable:expr) => {
        match $failable {
            $crate::Failable::Value(_) => {}
            $crate::Failable::Failure(f) => {
                panic!("Expected Value, got Failure: {:?}", f);
            }
        }
    };
}

/// Assert that a failable holds a failure.
///
/// This macro will panic if the failable holds a value.
///
/// # Example
///
/// ```rust
/// use resilient::{assert_failure, Failable};
///
/// let result = Failable::<i32, _>::failure("refused");
/// assert_failure!(result);
/// ```
#[macro_export]
macro_rules! assert_failure {
    ($failable:expr) => {
        match $failable {
            $crate::Failable::Failure(_) => {}
            $crate::Failable::Value(v) => {
                panic!("Expected Failure, got Value: {:?}", v);
            }
        }
    };
}

/// Assert that a failable holds a specific failure.
///
/// This macro will panic if the failable holds a value or if the failure doesn't
/// match the expected one.
///
/// # Example
///
/// ```rust
/// use resilient::{assert_failed_with, Failable};
///
/// let result = Failable::<i32, _>::failure("refused");
/// assert_failed_with!(result, "refused");
/// ```
#[macro_export]
macro_rules! assert_failed_with {
    ($failable:expr, $expected:expr) => {
        match $failable {
            $crate::Failable::Failure(failure) => {
                assert_eq!(failure, $expected);
            }
            $crate::Failable::Value(v) => {
                panic!(
                    "Expected Failure {:?}, got Value: {:?}",
                    $expected, v
                );
            }
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl<T, F> Arbitrary for crate::Failable<T, F>
where
    T: Arbitrary + 'static,
    F: Arbitrary + 'static,
{
    type Parameters = (T::Parameters, F::Parameters);
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        let (value_params, failure_params) = args;
        prop_oneof![
            any_with::<T>(value_params).prop_map(crate::Failable::Value),
            any_with::<F>(failure_params).prop_map(crate::Failable::Failure),
        ]
        .boxed()
    }
}
