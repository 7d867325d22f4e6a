//! # Resilient
//!
//! Composable fault tolerance for synchronous Rust code.
//!
//! A [`Task`] binds a callable to a [`Detector`](detector::Detector) that decides which
//! outcomes, returned values or panics, count as failures. Tasks run through a
//! [`Pipeline`] of policies: [`Retry`], [`CircuitBreaker`] and [`RateLimiter`] ship
//! with the crate, and any type implementing [`Policy`] can join them.
//!
//! Results are [`Failable`]: either the task's value or a failure of the caller's
//! failure type, into which the task and every policy convert their own failure kinds.
//!
//! ## Quick Example
//!
//! ```rust
//! use resilient::circuit_breaker::{CircuitOpen, CountStrategy};
//! use resilient::detector::{returns, ReturnedFailureValue};
//! use resilient::rate_limiter::{BlockingConcurrencyLimit, PermitAcquireTimeout};
//! use resilient::retry::NoMoreRetriesLeft;
//! use resilient::prelude::*;
//! use std::time::Duration;
//!
//! #[derive(Debug, PartialEq)]
//! enum Failure {
//!     NotFound,
//!     GaveUp,
//!     Open,
//!     Busy,
//! }
//!
//! impl From<ReturnedFailureValue> for Failure {
//!     fn from(_: ReturnedFailureValue) -> Self {
//!         Failure::NotFound
//!     }
//! }
//!
//! impl From<NoMoreRetriesLeft> for Failure {
//!     fn from(_: NoMoreRetriesLeft) -> Self {
//!         Failure::GaveUp
//!     }
//! }
//!
//! impl From<CircuitOpen> for Failure {
//!     fn from(_: CircuitOpen) -> Self {
//!         Failure::Open
//!     }
//! }
//!
//! impl From<PermitAcquireTimeout> for Failure {
//!     fn from(_: PermitAcquireTimeout) -> Self {
//!         Failure::Busy
//!     }
//! }
//!
//! let lookup = Task::new(|id: u32| if id % 2 == 0 { id * 10 } else { 0 }, returns(0u32));
//!
//! // Outermost first: retry, then the breaker, then the concurrency limit.
//! let pipeline = Pipeline::<u32, Failure>::new()
//!     .then(Retry::times(2))
//!     .then(CircuitBreaker::new(CountStrategy::default()))
//!     .then(RateLimiter::new(BlockingConcurrencyLimit::new(8, Duration::from_millis(10))));
//!
//! assert_eq!(pipeline.execute(|| lookup.run(4)), Failable::Value(40));
//! assert_eq!(pipeline.execute(|| lookup.run(3)), Failable::Failure(Failure::GaveUp));
//! ```
//!
//! ## Features
//!
//! - `tracing`: log retries, circuit breaker transitions and rejected calls with
//!   `tracing`
//! - `jitter`: randomize backoff delays
//! - `serde`: (de)serialize the configuration types
//! - `proptest`: `Arbitrary` implementation for [`Failable`]

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod log;

pub mod circuit_breaker;
pub mod clock;
pub mod detector;
pub mod failable;
pub mod policy;
pub mod rate_limiter;
pub mod retry;
pub mod task;
pub mod testing;

// Re-exports
pub use circuit_breaker::CircuitBreaker;
pub use failable::Failable;
pub use policy::{Noop, Pipeline, Policy, PolicyExt};
pub use rate_limiter::RateLimiter;
pub use retry::Retry;
pub use task::{Task, UnknownTaskResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::circuit_breaker::CircuitBreaker;
    pub use crate::detector::{any_of, returns, throws, Detected, Detector};
    pub use crate::failable::Failable;
    pub use crate::policy::{Noop, Pipeline, Policy, PolicyExt};
    pub use crate::rate_limiter::RateLimiter;
    pub use crate::retry::Retry;
    pub use crate::task::Task;
}
