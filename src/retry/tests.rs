//! Unit tests for `Retry` running tasks under each kind of retry state.

use super::*;
use crate::detector::{returns, throws, ReturnedFailureValue, Thrown};
use crate::policy::PolicyExt;
use crate::Task;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
enum TestFailure {
    Zero,
    Crashed(&'static str),
    NoMoreRetries,
    Exhausted(u32),
}

impl From<ReturnedFailureValue> for TestFailure {
    fn from(_: ReturnedFailureValue) -> Self {
        TestFailure::Zero
    }
}

impl From<Thrown<&'static str>> for TestFailure {
    fn from(thrown: Thrown<&'static str>) -> Self {
        TestFailure::Crashed(thrown.into_payload())
    }
}

impl From<NoMoreRetriesLeft> for TestFailure {
    fn from(_: NoMoreRetriesLeft) -> Self {
        TestFailure::NoMoreRetries
    }
}

impl From<RetryExhausted> for TestFailure {
    fn from(exhausted: RetryExhausted) -> Self {
        TestFailure::Exhausted(exhausted.attempts)
    }
}

impl From<Infallible> for TestFailure {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Fails (returns 0) for the first `failures` calls, then returns the call number.
fn flaky(failures: u32, attempts: &Arc<AtomicU32>) -> impl Fn(()) -> u32 {
    let attempts = Arc::clone(attempts);
    move |_| {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= failures {
            0
        } else {
            n
        }
    }
}

#[test]
fn test_retry_times_succeeds_on_last_retry() {
    let attempts = Arc::new(AtomicU32::new(0));
    let task = Task::new(flaky(3, &attempts), returns(0u32));

    let result: Failable<u32, TestFailure> = Retry::times(3).execute(|| task.run(()));

    assert_eq!(result, Failable::Value(4));
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}

#[test]
fn test_retry_times_replaces_task_failure() {
    let attempts = Arc::new(AtomicU32::new(0));
    let task = Task::new(flaky(4, &attempts), returns(0u32));

    let result: Failable<u32, TestFailure> = Retry::times(3).execute(|| task.run(()));

    // The task's own failure (Zero) is lost: only the stop value is reported.
    assert_eq!(result, Failable::Failure(TestFailure::NoMoreRetries));
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}

#[test]
fn test_retry_never_runs_once() {
    let attempts = Arc::new(AtomicU32::new(0));
    let task = Task::new(flaky(1, &attempts), returns(0u32));

    let result: Failable<u32, TestFailure> = Retry::never().execute(|| task.run(()));

    assert_eq!(result, Failable::Failure(TestFailure::NoMoreRetries));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_value_on_first_attempt_skips_state_queries() {
    struct Panicky;

    impl RetryState<TestFailure> for Panicky {
        type Stop = NoMoreRetriesLeft;

        fn failed_with(&mut self, _: TestFailure) {
            panic!("no failure happened");
        }

        fn should_retry(&mut self) -> RetryDecision<NoMoreRetriesLeft> {
            panic!("no failure happened");
        }
    }

    let retry = Retry::new(FnStateFactory::new(|| Panicky));
    let result: Failable<u8, TestFailure> = retry.execute(|| Failable::<u8, TestFailure>::Value(1));
    assert_eq!(result, Failable::Value(1));
}

#[test]
fn test_always_retry_until_value() {
    let attempts = Arc::new(AtomicU32::new(0));
    let task = Task::new(flaky(25, &attempts), returns(0u32));

    let result: Failable<u32, TestFailure> = Retry::always().execute(|| task.run(()));

    assert_eq!(result, Failable::Value(26));
}

#[test]
fn test_backoff_exhausts_with_metadata() {
    let attempts = Arc::new(AtomicU32::new(0));
    let task = Task::new(flaky(u32::MAX, &attempts), returns(0u32));
    let retry = Retry::backoff(BackoffPolicy::constant(Duration::from_millis(1)).with_max_retries(2));

    let start = Instant::now();
    let result: Failable<u32, TestFailure> = retry.execute(|| task.run(()));

    assert_eq!(result, Failable::Failure(TestFailure::Exhausted(3)));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() >= Duration::from_millis(2));
}

#[test]
fn test_claimed_panics_are_retried() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let task = Task::new(
        move |_: ()| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                panic!("transient")
            }
            "ok"
        },
        throws::<&'static str>(),
    );

    let result: Failable<&str, TestFailure> = Retry::times(5).execute(|| task.run(()));

    assert_eq!(result, Failable::Value("ok"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

/// Counts the states handed out and returned.
#[derive(Default)]
struct TrackingFactory {
    handed_out: AtomicU32,
    returned: AtomicU32,
    retries: u32,
}

impl<F> RetryStateFactory<F> for TrackingFactory {
    type State = RetryTimes;

    fn get_retry_state(&self) -> RetryTimes {
        self.handed_out.fetch_add(1, Ordering::SeqCst);
        RetryTimes::new(self.retries)
    }

    fn return_retry_state(&self, _state: RetryTimes) {
        self.returned.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_state_returned_once_on_value() {
    let retry = Retry::new(TrackingFactory {
        retries: 2,
        ..Default::default()
    });

    let _: Failable<u8, TestFailure> = retry.execute(|| Failable::<u8, TestFailure>::Value(1));

    assert_eq!(retry.factory().handed_out.load(Ordering::SeqCst), 1);
    assert_eq!(retry.factory().returned.load(Ordering::SeqCst), 1);
}

#[test]
fn test_state_returned_once_on_stop() {
    let retry = Retry::new(TrackingFactory {
        retries: 2,
        ..Default::default()
    });

    let result: Failable<u8, TestFailure> =
        retry.execute(|| Failable::<u8, TestFailure>::Failure(TestFailure::Zero));

    assert_eq!(result, Failable::Failure(TestFailure::NoMoreRetries));
    assert_eq!(retry.factory().handed_out.load(Ordering::SeqCst), 1);
    assert_eq!(retry.factory().returned.load(Ordering::SeqCst), 1);
}

#[test]
fn test_state_returned_once_on_panic() {
    let retry = Retry::new(TrackingFactory {
        retries: 2,
        ..Default::default()
    });

    let payload = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let _: Failable<u8, TestFailure> =
            retry.execute(|| -> Failable<u8, TestFailure> { panic!("unclaimed") });
    }))
    .expect_err("panic should propagate through retry");

    assert_eq!(payload.downcast_ref::<&str>(), Some(&"unclaimed"));
    assert_eq!(retry.factory().handed_out.load(Ordering::SeqCst), 1);
    assert_eq!(retry.factory().returned.load(Ordering::SeqCst), 1);
}

#[test]
fn test_each_job_gets_its_own_state() {
    let retry = Retry::times(1);

    for _ in 0..3 {
        let mut calls = 0;
        let result: Failable<u8, TestFailure> = retry.execute(|| {
            calls += 1;
            Failable::<u8, TestFailure>::Failure(TestFailure::Zero)
        });
        assert_eq!(result, Failable::Failure(TestFailure::NoMoreRetries));
        assert_eq!(calls, 2);
    }
}

#[test]
fn test_state_sees_every_failure() {
    #[derive(Clone, Default)]
    struct Recording {
        seen: Arc<parking_lot::Mutex<Vec<TestFailure>>>,
    }

    impl RetryState<TestFailure> for Recording {
        type Stop = NoMoreRetriesLeft;

        fn failed_with(&mut self, failure: TestFailure) {
            self.seen.lock().push(failure);
        }

        fn should_retry(&mut self) -> RetryDecision<NoMoreRetriesLeft> {
            if self.seen.lock().len() < 3 {
                RetryDecision::RetryAfter(Duration::ZERO)
            } else {
                RetryDecision::Stop(NoMoreRetriesLeft)
            }
        }
    }

    let state = Recording::default();
    let retry = Retry::new(CloneStateFactory::new(state.clone()));
    let mut n = 0;
    let _: Failable<u8, TestFailure> = retry.execute(|| {
        n += 1;
        Failable::<u8, TestFailure>::Failure(TestFailure::Exhausted(n))
    });

    assert_eq!(
        *state.seen.lock(),
        vec![
            TestFailure::Exhausted(1),
            TestFailure::Exhausted(2),
            TestFailure::Exhausted(3)
        ]
    );
}

#[cfg(feature = "tracing")]
mod traced {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_retry_logs_attempts() {
        let _: Failable<u8, TestFailure> =
            Retry::times(1).execute(|| Failable::<u8, TestFailure>::Failure(TestFailure::Zero));

        assert!(logs_contain("attempt failed, retrying"));
        assert!(logs_contain("attempt failed, no more retries"));
    }
}

#[test]
fn test_shared_budget_spans_jobs() {
    let budget = SharedStateFactory::new(RetryTimes::new(3));
    let retry = Retry::new(budget.clone());

    let attempts = Arc::new(AtomicU32::new(0));
    let first = Task::new(flaky(2, &attempts), returns(0u32));
    let result: Failable<u32, TestFailure> = retry.execute(|| first.run(()));
    assert_eq!(result, Failable::Value(3));
    assert_eq!(budget.lock().retries_left(), 1);

    let attempts = Arc::new(AtomicU32::new(0));
    let second = Task::new(flaky(u32::MAX, &attempts), returns(0u32));
    let result: Failable<u32, TestFailure> = retry.execute(|| second.run(()));
    assert_eq!(result, Failable::Failure(TestFailure::NoMoreRetries));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(budget.lock().retries_left(), 0);
}
