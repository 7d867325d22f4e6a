//! Ordered composition of policies.

use std::fmt;

use super::Policy;
use crate::failable::Failable;

/// An ordered list of policies applied around a callable.
///
/// The first policy added is the outermost one: it receives a continuation running
/// the second policy, and so on down to the callable. A pipeline is itself a
/// [`Policy`], so pipelines can be nested.
///
/// # Example
///
/// ```
/// use resilient::circuit_breaker::{CircuitOpen, CountStrategy};
/// use resilient::{CircuitBreaker, Failable, Pipeline, PolicyExt};
///
/// #[derive(Debug, PartialEq)]
/// struct Rejected;
///
/// impl From<CircuitOpen> for Rejected {
///     fn from(_: CircuitOpen) -> Self {
///         Rejected
///     }
/// }
///
/// let pipeline = Pipeline::<&str, Rejected>::new()
///     .then(CircuitBreaker::new(CountStrategy::default()));
///
/// assert_eq!(
///     pipeline.execute(|| Failable::<_, Rejected>::Value("ok")),
///     Failable::Value("ok")
/// );
/// ```
pub struct Pipeline<T, F> {
    policies: Vec<Box<dyn Policy<T, F> + Send + Sync>>,
}

impl<T, F> Pipeline<T, F> {
    /// An empty pipeline, which runs the callable directly.
    pub fn new() -> Self {
        Self {
            policies: Vec::new(),
        }
    }

    /// Add `policy` inside every policy added so far.
    pub fn then<P>(mut self, policy: P) -> Self
    where
        P: Policy<T, F> + Send + Sync + 'static,
    {
        self.push(policy);
        self
    }

    /// Add `policy` inside every policy added so far.
    pub fn push<P>(&mut self, policy: P)
    where
        P: Policy<T, F> + Send + Sync + 'static,
    {
        self.policies.push(Box::new(policy));
    }

    /// Number of policies in the pipeline.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns `true` if the pipeline holds no policy.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    fn execute_from(
        &self,
        index: usize,
        next: &mut dyn FnMut() -> Failable<T, F>,
    ) -> Failable<T, F> {
        match self.policies.get(index) {
            None => next(),
            Some(policy) => policy.apply(&mut || self.execute_from(index + 1, &mut *next)),
        }
    }
}

impl<T, F> Policy<T, F> for Pipeline<T, F> {
    fn apply(&self, next: &mut dyn FnMut() -> Failable<T, F>) -> Failable<T, F> {
        self.execute_from(0, next)
    }
}

impl<T, F> Default for Pipeline<T, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, F> fmt::Debug for Pipeline<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("policies", &self.policies.len())
            .finish()
    }
}
