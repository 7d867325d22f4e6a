//! Rolling-window failure counting.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{CircuitBreakerStrategy, CircuitState};
use crate::clock::{Clock, SystemClock};
use crate::log;

/// Thresholds and durations of a [`CountStrategy`].
///
/// # Example
///
/// ```
/// use resilient::circuit_breaker::CountStrategyConfig;
/// use std::time::Duration;
///
/// let config = CountStrategyConfig::default()
///     .with_failure_threshold(10)
///     .with_trip_duration(Duration::from_secs(5));
///
/// assert_eq!(config.failure_threshold, 10);
/// assert_eq!(config.failure_window, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CountStrategyConfig {
    /// Failures within one window that open the circuit.
    pub failure_threshold: u32,
    /// Length of a failure window, starting at its first failure.
    pub failure_window: Duration,
    /// How long the circuit stays open before probing.
    pub trip_duration: Duration,
    /// Consecutive successes while half-open that close the circuit.
    pub recover_successes: u32,
}

impl Default for CountStrategyConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            trip_duration: Duration::from_secs(30),
            recover_successes: 2,
        }
    }
}

impl CountStrategyConfig {
    /// Set the failures within one window that open the circuit.
    pub fn with_failure_threshold(mut self, failures: u32) -> Self {
        self.failure_threshold = failures;
        self
    }

    /// Set the length of a failure window.
    pub fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    /// Set how long the circuit stays open.
    pub fn with_trip_duration(mut self, duration: Duration) -> Self {
        self.trip_duration = duration;
        self
    }

    /// Set the successes while half-open that close the circuit.
    pub fn with_recover_successes(mut self, successes: u32) -> Self {
        self.recover_successes = successes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed {
        window_start: Option<Instant>,
        failures: u32,
    },
    /// `until` is `None` when the trip end is not representable: the circuit stays open.
    Open { until: Option<Instant> },
    HalfOpen { successes: u32 },
}

impl BreakerState {
    const CLOSED: BreakerState = BreakerState::Closed {
        window_start: None,
        failures: 0,
    };

    fn circuit_state(&self) -> CircuitState {
        match self {
            BreakerState::Closed { .. } => CircuitState::Closed,
            BreakerState::Open { .. } => CircuitState::Open,
            BreakerState::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

/// A circuit breaker strategy counting failures over a rolling window.
///
/// - **Closed**: every call goes through. The first failure opens a window of
///   `failure_window`; a failure arriving after the window ended starts a new one.
///   Reaching `failure_threshold` failures within a window opens the circuit.
///   Successes don't reset the count.
/// - **Open**: calls are rejected until `trip_duration` has elapsed. The first call
///   after that is let through and the circuit becomes half-open.
/// - **HalfOpen**: calls go through. A single failure opens the circuit again;
///   `recover_successes` successes close it with a fresh window.
///
/// Registrations arriving while open, from calls let through before the circuit
/// opened, are ignored.
///
/// The state is guarded by a mutex held only while reading or changing the state.
#[derive(Debug)]
pub struct CountStrategy<C = SystemClock> {
    config: CountStrategyConfig,
    clock: C,
    state: Mutex<BreakerState>,
}

impl CountStrategy {
    /// A closed circuit breaker strategy using the system clock.
    pub fn new(
        failure_threshold: u32,
        failure_window: Duration,
        trip_duration: Duration,
        recover_successes: u32,
    ) -> Self {
        Self::from_config(CountStrategyConfig {
            failure_threshold,
            failure_window,
            trip_duration,
            recover_successes,
        })
    }

    /// A closed circuit breaker strategy configured by `config`.
    pub fn from_config(config: CountStrategyConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for CountStrategy {
    fn default() -> Self {
        Self::from_config(CountStrategyConfig::default())
    }
}

impl<C: Clock> CountStrategy<C> {
    /// A closed circuit breaker strategy reading time from `clock`.
    pub fn with_clock(config: CountStrategyConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(BreakerState::CLOSED),
        }
    }

    /// The configuration of this strategy.
    pub fn config(&self) -> &CountStrategyConfig {
        &self.config
    }

    /// The current state of the circuit.
    ///
    /// An open circuit whose trip duration has elapsed is still reported as open
    /// until the next call is let through.
    pub fn state(&self) -> CircuitState {
        self.state.lock().circuit_state()
    }

    fn open(&self, state: &mut BreakerState, now: Instant) {
        transition(
            state,
            BreakerState::Open {
                until: now.checked_add(self.config.trip_duration),
            },
        );
    }
}

fn transition(state: &mut BreakerState, next: BreakerState) {
    match next {
        BreakerState::Open { .. } => {
            log::warning!(from = ?state.circuit_state(), "circuit breaker opened")
        }
        _ => log::debug!(
            from = ?state.circuit_state(),
            to = ?next.circuit_state(),
            "circuit breaker state changed"
        ),
    }
    *state = next;
}

impl<C: Clock> CircuitBreakerStrategy for CountStrategy<C> {
    fn allow_call(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            BreakerState::Closed { .. } | BreakerState::HalfOpen { .. } => true,
            BreakerState::Open { until: Some(until) } if self.clock.now() >= until => {
                transition(&mut state, BreakerState::HalfOpen { successes: 0 });
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    fn register_failure(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let should_open = match &mut *state {
            BreakerState::Closed {
                window_start,
                failures,
            } => {
                let expired = match *window_start {
                    None => true,
                    Some(start) => start
                        .checked_add(self.config.failure_window)
                        .is_some_and(|end| now > end),
                };
                if expired {
                    *window_start = Some(now);
                    *failures = 0;
                }
                *failures = failures.saturating_add(1);
                *failures >= self.config.failure_threshold
            }
            BreakerState::Open { .. } => false,
            BreakerState::HalfOpen { .. } => true,
        };

        if should_open {
            self.open(&mut state, now);
        }
    }

    fn register_success(&self) {
        let mut state = self.state.lock();
        let should_close = match &mut *state {
            BreakerState::HalfOpen { successes } => {
                *successes = successes.saturating_add(1);
                *successes >= self.config.recover_successes
            }
            BreakerState::Closed { .. } | BreakerState::Open { .. } => false,
        };

        if should_close {
            transition(&mut state, BreakerState::CLOSED);
        }
    }
}
