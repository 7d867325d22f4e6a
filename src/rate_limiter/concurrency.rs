//! Bounding concurrent executions.

use std::fmt;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::RateLimiterStrategy;
use crate::log;

/// Reported when no permit became available within the maximum wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermitAcquireTimeout {
    /// How long the caller waited.
    pub max_wait: Duration,
}

impl fmt::Display for PermitAcquireTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no permit available after waiting {:?}", self.max_wait)
    }
}

impl std::error::Error for PermitAcquireTimeout {}

/// Proof that one concurrent execution slot is held.
///
/// Only [`BlockingConcurrencyLimit::acquire`] creates permits.
#[derive(Debug, PartialEq, Eq)]
pub struct ConcurrencyPermit {
    _private: (),
}

/// Capacity and maximum wait of a [`BlockingConcurrencyLimit`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConcurrencyLimitConfig {
    /// Executions allowed to run at the same time.
    pub max_concurrent: usize,
    /// How long a caller waits for a free slot before giving up.
    pub max_wait: Duration,
}

impl ConcurrencyLimitConfig {
    /// Allow `max_concurrent` executions, waiting up to `max_wait` for a slot.
    pub fn new(max_concurrent: usize, max_wait: Duration) -> Self {
        Self {
            max_concurrent,
            max_wait,
        }
    }

    /// Set the executions allowed to run at the same time.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Set how long a caller waits for a free slot.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// Allows a fixed number of concurrent executions.
///
/// When every slot is taken, [`acquire`](RateLimiterStrategy::acquire) blocks the
/// calling thread until a slot is released or `max_wait` has elapsed. Each release
/// wakes a single waiter.
///
/// # Example
///
/// ```
/// use resilient::rate_limiter::{BlockingConcurrencyLimit, PermitAcquireTimeout, RateLimiterStrategy};
/// use std::time::Duration;
///
/// let limit = BlockingConcurrencyLimit::new(1, Duration::from_millis(1));
///
/// let permit = limit.acquire().unwrap();
/// assert_eq!(
///     limit.acquire(),
///     Err(PermitAcquireTimeout { max_wait: Duration::from_millis(1) })
/// );
///
/// limit.release(permit);
/// assert!(limit.acquire().is_ok());
/// ```
#[derive(Debug)]
pub struct BlockingConcurrencyLimit {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
    max_wait: Duration,
}

impl BlockingConcurrencyLimit {
    /// Allow `max_concurrent` executions, waiting up to `max_wait` for a slot.
    pub fn new(max_concurrent: usize, max_wait: Duration) -> Self {
        Self {
            available: Mutex::new(max_concurrent),
            released: Condvar::new(),
            capacity: max_concurrent,
            max_wait,
        }
    }

    /// A limit configured by `config`.
    pub fn from_config(config: &ConcurrencyLimitConfig) -> Self {
        Self::new(config.max_concurrent, config.max_wait)
    }

    /// Slots currently free.
    pub fn available_permits(&self) -> usize {
        *self.available.lock()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How long a caller waits for a free slot.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }
}

impl RateLimiterStrategy for BlockingConcurrencyLimit {
    type Permit = ConcurrencyPermit;
    type Error = PermitAcquireTimeout;

    fn acquire(&self) -> Result<ConcurrencyPermit, PermitAcquireTimeout> {
        let mut available = self.available.lock();
        if *available == 0 {
            self.released
                .wait_while_for(&mut available, |available| *available == 0, self.max_wait);
        }

        if *available == 0 {
            log::debug!(max_wait = ?self.max_wait, "timed out waiting for a permit");
            return Err(PermitAcquireTimeout {
                max_wait: self.max_wait,
            });
        }

        *available -= 1;
        Ok(ConcurrencyPermit { _private: () })
    }

    fn release(&self, permit: ConcurrencyPermit) {
        drop(permit);
        let mut available = self.available.lock();
        *available = (*available + 1).min(self.capacity);
        self.released.notify_one();
    }
}
