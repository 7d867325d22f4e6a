//! Rate limiting.
//!
//! A [`RateLimiter`] runs its continuation only after acquiring a permit from a
//! [`RateLimiterStrategy`], and releases the permit once the continuation returns or
//! unwinds. [`BlockingConcurrencyLimit`] bounds the number of concurrent executions,
//! blocking callers for a bounded time while every permit is taken.

mod concurrency;

use crate::failable::Failable;
use crate::log;
use crate::policy::Policy;

pub use concurrency::{
    BlockingConcurrencyLimit, ConcurrencyLimitConfig, ConcurrencyPermit, PermitAcquireTimeout,
};

/// Hands out permits to run a call.
///
/// Strategies are shared by every call going through the limiter, possibly from
/// several threads, and must synchronize their own state.
pub trait RateLimiterStrategy {
    /// Proof that a call may run.
    type Permit;
    /// Reported when no permit could be acquired.
    type Error;

    /// Get a permit, possibly waiting for one.
    fn acquire(&self) -> Result<Self::Permit, Self::Error>;

    /// Give back a permit obtained from [`acquire`](RateLimiterStrategy::acquire).
    fn release(&self, permit: Self::Permit);
}

impl<S: RateLimiterStrategy + ?Sized> RateLimiterStrategy for std::sync::Arc<S> {
    type Permit = S::Permit;
    type Error = S::Error;

    fn acquire(&self) -> Result<S::Permit, S::Error> {
        (**self).acquire()
    }

    fn release(&self, permit: S::Permit) {
        (**self).release(permit)
    }
}

/// A policy running calls only with a permit from its strategy.
///
/// # Example
///
/// ```
/// use resilient::rate_limiter::{BlockingConcurrencyLimit, PermitAcquireTimeout};
/// use resilient::{Failable, PolicyExt, RateLimiter};
/// use std::time::Duration;
///
/// let limiter = RateLimiter::new(BlockingConcurrencyLimit::new(4, Duration::from_millis(50)));
///
/// let result: Failable<u32, PermitAcquireTimeout> =
///     limiter.execute(|| Failable::<u32, PermitAcquireTimeout>::Value(7));
/// assert_eq!(result, Failable::Value(7));
/// assert_eq!(limiter.strategy().available_permits(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RateLimiter<S> {
    strategy: S,
}

impl<S> RateLimiter<S> {
    /// A rate limiter driven by `strategy`.
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }

    /// The strategy handing out permits.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }
}

/// Releases the permit when dropped.
struct PermitGuard<'a, S: RateLimiterStrategy> {
    strategy: &'a S,
    permit: Option<S::Permit>,
}

impl<S: RateLimiterStrategy> Drop for PermitGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            self.strategy.release(permit);
        }
    }
}

impl<T, F, S> Policy<T, F> for RateLimiter<S>
where
    S: RateLimiterStrategy,
    F: From<S::Error>,
{
    fn apply(&self, next: &mut dyn FnMut() -> Failable<T, F>) -> Failable<T, F> {
        let permit = match self.strategy.acquire() {
            Ok(permit) => permit,
            Err(error) => {
                log::debug!("rate limiter rejected call");
                return Failable::Failure(F::from(error));
            }
        };

        let _guard = PermitGuard {
            strategy: &self.strategy,
            permit: Some(permit),
        };
        next()
    }
}
