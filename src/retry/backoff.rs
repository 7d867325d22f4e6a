//! Backoff retry states and their configuration.

use std::time::{Duration, Instant};

use super::{RetryDecision, RetryExhausted, RetryState, RetryStateFactory};
use crate::clock::{Clock, SystemClock};

/// How long a [`Backoff`] state waits before each retry, and when it gives up.
///
/// A policy is plain data, cheap to clone and share between factories. With the
/// `serde` feature it can be read from configuration; missing bounds and jitter
/// default to "none".
///
/// The delay before retry `n` (counting from 0) is the curve's delay for `n`, then
/// jittered, then capped at `max_delay`. Once `max_retries` retries have been granted
/// the state stops. A policy with neither bound retries forever;
/// [`validate`](BackoffPolicy::validate) flags it for callers that want to refuse it.
///
/// # Example
///
/// ```rust
/// use resilient::retry::{BackoffPolicy, JitterStrategy};
/// use std::time::Duration;
///
/// let policy = BackoffPolicy::exponential(Duration::from_millis(50))
///     .with_max_retries(4)
///     .with_max_delay(Duration::from_millis(300))
///     .with_jitter(JitterStrategy::Proportional(0.2));
///
/// assert_eq!(policy.base_delay(2), Some(Duration::from_millis(200)));
/// assert_eq!(policy.base_delay(3), Some(Duration::from_millis(300)));
/// assert_eq!(policy.base_delay(4), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackoffPolicy {
    curve: BackoffCurve,
    #[cfg_attr(feature = "serde", serde(default))]
    max_retries: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    max_delay: Option<Duration>,
    #[cfg_attr(feature = "serde", serde(default))]
    jitter: JitterStrategy,
}

/// Growth of the delay with the retry index `n` (starting at 0).
///
/// Arithmetic saturates: huge indices yield `Duration::MAX` rather than overflowing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackoffCurve {
    /// The same delay every time.
    Constant(Duration),
    /// `base * (n + 1)`.
    Linear {
        /// Delay before the first retry.
        base: Duration,
    },
    /// `base * 2^n`.
    Exponential {
        /// Delay before the first retry.
        base: Duration,
    },
    /// `base * fib(n + 1)`: 1, 1, 2, 3, 5, 8... times `base`.
    Fibonacci {
        /// Delay before the first retry.
        base: Duration,
    },
}

impl BackoffCurve {
    /// Delay before retry `n`, before jitter and capping.
    pub fn delay(&self, n: u32) -> Duration {
        match *self {
            BackoffCurve::Constant(delay) => delay,
            BackoffCurve::Linear { base } => base.saturating_mul(n.saturating_add(1)),
            BackoffCurve::Exponential { base } => base.saturating_mul(2u32.saturating_pow(n)),
            BackoffCurve::Fibonacci { base } => base.saturating_mul(fib(n.saturating_add(1))),
        }
    }
}

/// Randomization applied to each delay.
///
/// Randomness needs the `jitter` feature; without it every strategy returns the delay
/// unchanged. Delays are drawn with nanosecond resolution.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JitterStrategy {
    /// Keep the delay as computed.
    #[default]
    None,
    /// Uniform in `delay * (1 - factor) ..= delay * (1 + factor)`.
    Proportional(f64),
    /// Uniform in `0 ..= delay`.
    Full,
    /// Uniform in `delay ..= 3 * previous delay`, or the delay itself when that range
    /// is empty.
    Decorrelated,
}

impl BackoffPolicy {
    /// A policy following `curve`, with no bound and no jitter.
    pub fn new(curve: BackoffCurve) -> Self {
        Self {
            curve,
            max_retries: None,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    /// Wait `delay` before every retry.
    pub fn constant(delay: Duration) -> Self {
        Self::new(BackoffCurve::Constant(delay))
    }

    /// Wait `base`, `2 * base`, `3 * base`...
    pub fn linear(base: Duration) -> Self {
        Self::new(BackoffCurve::Linear { base })
    }

    /// Wait `base`, `2 * base`, `4 * base`...
    pub fn exponential(base: Duration) -> Self {
        Self::new(BackoffCurve::Exponential { base })
    }

    /// Wait `base`, `base`, `2 * base`, `3 * base`, `5 * base`...
    pub fn fibonacci(base: Duration) -> Self {
        Self::new(BackoffCurve::Fibonacci { base })
    }

    /// Grant at most `retries` retries, so `retries + 1` attempts in total.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Never wait longer than `cap`, jitter included.
    pub fn with_max_delay(mut self, cap: Duration) -> Self {
        self.max_delay = Some(cap);
        self
    }

    /// Randomize delays with `jitter`.
    ///
    /// A proportional factor is clamped to `0.0..=1.0`.
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = match jitter {
            JitterStrategy::Proportional(factor) => {
                JitterStrategy::Proportional(factor.clamp(0.0, 1.0))
            }
            other => other,
        };
        self
    }

    /// The delay curve.
    pub fn curve(&self) -> &BackoffCurve {
        &self.curve
    }

    /// Retries granted before giving up, if bounded.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Upper bound on every delay.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// The randomization applied to delays.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// Capped delay before retry `n`, without jitter, or `None` when retry `n` is not
    /// granted.
    pub fn base_delay(&self, n: u32) -> Option<Duration> {
        if self.max_retries.is_some_and(|max| n >= max) {
            return None;
        }
        Some(self.cap(self.curve.delay(n)))
    }

    /// Delay before retry `n` with jitter, `previous` being the delay before retry
    /// `n - 1`.
    fn jittered_delay(&self, n: u32, previous: Option<Duration>) -> Option<Duration> {
        let delay = self.base_delay(n)?;
        Some(self.cap(self.jitter.apply(delay, previous)))
    }

    fn cap(&self, delay: Duration) -> Duration {
        self.max_delay.map_or(delay, |cap| delay.min(cap))
    }

    /// Check that the policy has at least one bound.
    ///
    /// Unbounded policies are allowed; this is for callers that want to reject them,
    /// for instance when loading policies from configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_retries.is_none() && self.max_delay.is_none() {
            Err("backoff policy has neither max_retries nor max_delay")
        } else {
            Ok(())
        }
    }
}

impl JitterStrategy {
    /// Randomize `delay`; `previous` is only used by [`JitterStrategy::Decorrelated`].
    #[cfg(feature = "jitter")]
    pub fn apply(&self, delay: Duration, previous: Option<Duration>) -> Duration {
        let nanos = delay.as_nanos();
        match *self {
            JitterStrategy::None => delay,
            JitterStrategy::Proportional(factor) => {
                // NaN and negative factors cast to 0.
                let spread = (nanos as f64 * factor) as u128;
                uniform_nanos(nanos.saturating_sub(spread), nanos.saturating_add(spread))
            }
            JitterStrategy::Full => uniform_nanos(0, nanos),
            JitterStrategy::Decorrelated => {
                let ceiling = previous.unwrap_or(delay).as_nanos().saturating_mul(3);
                uniform_nanos(nanos, ceiling)
            }
        }
    }

    /// Randomize `delay`; without the `jitter` feature this returns it unchanged.
    #[cfg(not(feature = "jitter"))]
    pub fn apply(&self, delay: Duration, _previous: Option<Duration>) -> Duration {
        delay
    }
}

/// A duration drawn uniformly from `low..=high` nanoseconds, or `low` if the range is
/// empty.
#[cfg(feature = "jitter")]
fn uniform_nanos(low: u128, high: u128) -> Duration {
    use rand::Rng;

    let nanos = if high <= low {
        low
    } else {
        rand::rng().random_range(low..=high)
    };
    from_nanos(nanos)
}

#[cfg(feature = "jitter")]
fn from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
        Err(_) => Duration::MAX,
    }
}

/// `n`th Fibonacci number, saturating at `u32::MAX`.
fn fib(n: u32) -> u32 {
    let (mut current, mut next) = (0u32, 1u32);
    for _ in 0..n {
        if current == u32::MAX {
            break;
        }
        (current, next) = (next, current.saturating_add(next));
    }
    current
}

/// Retry state following a [`BackoffPolicy`] for one job.
///
/// Stops with [`RetryExhausted`] once the policy allows no further retry. Failures of
/// the job are not inspected.
#[derive(Debug, Clone)]
pub struct Backoff<C = SystemClock> {
    policy: BackoffPolicy,
    clock: C,
    started: Instant,
    retries: u32,
    prev_delay: Option<Duration>,
}

impl Backoff {
    /// Start following `policy`, measuring time with the system clock.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }
}

impl<C: Clock> Backoff<C> {
    /// Start following `policy`, measuring time with `clock`.
    pub fn with_clock(policy: BackoffPolicy, clock: C) -> Self {
        let started = clock.now();
        Self {
            policy,
            clock,
            started,
            retries: 0,
            prev_delay: None,
        }
    }

    /// Number of retries granted so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// The followed policy.
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}

impl<F, C: Clock> RetryState<F> for Backoff<C> {
    type Stop = RetryExhausted;

    fn failed_with(&mut self, _failure: F) {}

    fn should_retry(&mut self) -> RetryDecision<RetryExhausted> {
        match self.policy.jittered_delay(self.retries, self.prev_delay) {
            Some(delay) => {
                self.retries = self.retries.saturating_add(1);
                self.prev_delay = Some(delay);
                RetryDecision::RetryAfter(delay)
            }
            None => RetryDecision::Stop(RetryExhausted::new(
                self.retries.saturating_add(1),
                self.clock.now().saturating_duration_since(self.started),
            )),
        }
    }
}

/// Hands out a fresh [`Backoff`] for every job.
#[derive(Debug, Clone)]
pub struct BackoffFactory<C = SystemClock> {
    policy: BackoffPolicy,
    clock: C,
}

impl BackoffFactory {
    /// A factory for `policy`, using the system clock.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }
}

impl<C> BackoffFactory<C> {
    /// A factory for `policy`, measuring time with `clock`.
    pub fn with_clock(policy: BackoffPolicy, clock: C) -> Self {
        Self { policy, clock }
    }

    /// The policy every handed out state follows.
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}

impl<F, C: Clock + Clone> RetryStateFactory<F> for BackoffFactory<C> {
    type State = Backoff<C>;

    fn get_retry_state(&self) -> Backoff<C> {
        Backoff::with_clock(self.policy.clone(), self.clock.clone())
    }
}
