//! The value-or-failure type returned by tasks and policies
//!
//! `Failable<T, F>` is shaped like `Result<T, E>`, but it only carries *recognized*
//! failures: outcomes that a [`Detector`](crate::detector::Detector) classified or that a
//! policy produced for its own terminal condition (an open breaker, a permit timeout,
//! retries running out). Anything unrecognized never becomes a `Failable`; it keeps
//! unwinding as a panic.
//!
//! # Examples
//!
//! ```
//! use resilient::Failable;
//!
//! let ok = Failable::<_, &str>::value(42);
//! let failed = Failable::<i32, _>::failure("timeout");
//!
//! assert!(ok.holds_value());
//! assert!(failed.holds_failure());
//! assert_eq!(ok.get_value(), &42);
//! assert_eq!(failed.get_failure(), &"timeout");
//! ```
//!
//! ## Widening the failure type
//!
//! Policies that can fail themselves need room in the failure type for their own
//! kind. `widen` converts the failure with `Into`:
//!
//! ```
//! use resilient::Failable;
//!
//! #[derive(Debug, PartialEq)]
//! enum Failure {
//!     Code(u16),
//!     Open,
//! }
//!
//! impl From<u16> for Failure {
//!     fn from(code: u16) -> Self {
//!         Failure::Code(code)
//!     }
//! }
//!
//! let narrow = Failable::<(), u16>::failure(503);
//! let wide: Failable<(), Failure> = narrow.widen();
//! assert_eq!(wide, Failable::Failure(Failure::Code(503)));
//! ```

/// Either a successful value or a recognized failure
///
/// Exactly one of the two alternatives is held at any time. The value comes first in
/// the parameter list, the same way as `Result<T, E>`.
///
/// # Type Parameters
///
/// * `T` - The type of the success value
/// * `F` - The type of the failure (often an enum collecting several failure kinds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Failable<T, F> {
    /// The operation produced a value
    Value(T),
    /// The operation failed in a recognized way
    Failure(F),
}

impl<T, F> Failable<T, F> {
    /// Create a `Failable` holding a value
    ///
    /// # Examples
    ///
    /// ```
    /// use resilient::Failable;
    ///
    /// let f = Failable::<i32, String>::value(42);
    /// assert!(f.holds_value());
    /// ```
    #[inline]
    pub fn value(value: T) -> Self {
        Failable::Value(value)
    }

    /// Create a `Failable` holding a failure
    ///
    /// # Examples
    ///
    /// ```
    /// use resilient::Failable;
    ///
    /// let f = Failable::<i32, _>::failure("boom");
    /// assert!(f.holds_failure());
    /// ```
    #[inline]
    pub fn failure(failure: F) -> Self {
        Failable::Failure(failure)
    }

    /// Create a `Failable` from a `Result`
    #[inline]
    pub fn from_result(result: Result<T, F>) -> Self {
        match result {
            Ok(value) => Failable::Value(value),
            Err(failure) => Failable::Failure(failure),
        }
    }

    /// Convert into a `Result`, so the `?` operator can be used downstream
    ///
    /// # Examples
    ///
    /// ```
    /// use resilient::Failable;
    ///
    /// assert_eq!(Failable::<_, String>::value(1).into_result(), Ok(1));
    /// assert_eq!(Failable::<i32, _>::failure("no").into_result(), Err("no"));
    /// ```
    #[inline]
    pub fn into_result(self) -> Result<T, F> {
        match self {
            Failable::Value(value) => Ok(value),
            Failable::Failure(failure) => Err(failure),
        }
    }

    /// Returns `true` if a value is held
    #[inline]
    pub fn holds_value(&self) -> bool {
        matches!(self, Failable::Value(_))
    }

    /// Returns `true` if a failure is held
    #[inline]
    pub fn holds_failure(&self) -> bool {
        matches!(self, Failable::Failure(_))
    }

    /// Borrow the value
    ///
    /// # Panics
    ///
    /// Panics if a failure is held. Asking for the value of a failed operation is a
    /// programming error, check [`holds_value`](Self::holds_value) first or use
    /// [`value_ref`](Self::value_ref).
    #[inline]
    #[track_caller]
    pub fn get_value(&self) -> &T {
        match self {
            Failable::Value(value) => value,
            Failable::Failure(_) => panic!("called `Failable::get_value()` on a `Failure`"),
        }
    }

    /// Borrow the failure
    ///
    /// # Panics
    ///
    /// Panics if a value is held.
    #[inline]
    #[track_caller]
    pub fn get_failure(&self) -> &F {
        match self {
            Failable::Failure(failure) => failure,
            Failable::Value(_) => panic!("called `Failable::get_failure()` on a `Value`"),
        }
    }

    /// Take the value
    ///
    /// # Panics
    ///
    /// Panics if a failure is held.
    #[inline]
    #[track_caller]
    pub fn into_value(self) -> T {
        match self {
            Failable::Value(value) => value,
            Failable::Failure(_) => panic!("called `Failable::into_value()` on a `Failure`"),
        }
    }

    /// Take the failure
    ///
    /// # Panics
    ///
    /// Panics if a value is held.
    #[inline]
    #[track_caller]
    pub fn into_failure(self) -> F {
        match self {
            Failable::Failure(failure) => failure,
            Failable::Value(_) => panic!("called `Failable::into_failure()` on a `Value`"),
        }
    }

    /// Borrow the value if one is held
    #[inline]
    pub fn value_ref(&self) -> Option<&T> {
        match self {
            Failable::Value(value) => Some(value),
            Failable::Failure(_) => None,
        }
    }

    /// Borrow the failure if one is held
    #[inline]
    pub fn failure_ref(&self) -> Option<&F> {
        match self {
            Failable::Failure(failure) => Some(failure),
            Failable::Value(_) => None,
        }
    }

    /// Convert from `&Failable<T, F>` to `Failable<&T, &F>`
    #[inline]
    pub fn as_ref(&self) -> Failable<&T, &F> {
        match self {
            Failable::Value(value) => Failable::Value(value),
            Failable::Failure(failure) => Failable::Failure(failure),
        }
    }

    /// Dispatch on the held alternative
    ///
    /// # Examples
    ///
    /// ```
    /// use resilient::Failable;
    ///
    /// let f = Failable::<i32, &str>::failure("refused");
    /// let text = f.visit(|v| format!("got {}", v), |e| format!("failed: {}", e));
    /// assert_eq!(text, "failed: refused");
    /// ```
    #[inline]
    pub fn visit<R, V, G>(self, value_fn: V, failure_fn: G) -> R
    where
        V: FnOnce(T) -> R,
        G: FnOnce(F) -> R,
    {
        match self {
            Failable::Value(value) => value_fn(value),
            Failable::Failure(failure) => failure_fn(failure),
        }
    }

    /// Transform the value if present
    #[inline]
    pub fn map<U, M>(self, f: M) -> Failable<U, F>
    where
        M: FnOnce(T) -> U,
    {
        match self {
            Failable::Value(value) => Failable::Value(f(value)),
            Failable::Failure(failure) => Failable::Failure(failure),
        }
    }

    /// Transform the failure if present
    #[inline]
    pub fn map_failure<G, M>(self, f: M) -> Failable<T, G>
    where
        M: FnOnce(F) -> G,
    {
        match self {
            Failable::Value(value) => Failable::Value(value),
            Failable::Failure(failure) => Failable::Failure(f(failure)),
        }
    }

    /// Chain an operation that may fail with the same failure type
    #[inline]
    pub fn and_then<U, M>(self, f: M) -> Failable<U, F>
    where
        M: FnOnce(T) -> Failable<U, F>,
    {
        match self {
            Failable::Value(value) => f(value),
            Failable::Failure(failure) => Failable::Failure(failure),
        }
    }

    /// Convert the failure into a wider failure type
    #[inline]
    pub fn widen<G>(self) -> Failable<T, G>
    where
        F: Into<G>,
    {
        self.map_failure(Into::into)
    }
}

impl<T, F> From<Result<T, F>> for Failable<T, F> {
    fn from(result: Result<T, F>) -> Self {
        Failable::from_result(result)
    }
}

impl<T, F> From<Failable<T, F>> for Result<T, F> {
    fn from(failable: Failable<T, F>) -> Self {
        failable.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_queries() {
        let f = Failable::<_, String>::value(7);
        assert!(f.holds_value());
        assert!(!f.holds_failure());
        assert_eq!(f.value_ref(), Some(&7));
        assert_eq!(f.failure_ref(), None);
    }

    #[test]
    fn test_failure_queries() {
        let f = Failable::<i32, _>::failure("bad");
        assert!(f.holds_failure());
        assert!(!f.holds_value());
        assert_eq!(f.failure_ref(), Some(&"bad"));
        assert_eq!(f.value_ref(), None);
    }

    #[test]
    fn test_getters_are_repeatable() {
        let f = Failable::<String, ()>::value("v".to_string());
        assert_eq!(f.get_value(), f.get_value());

        let g = Failable::<(), String>::failure("e".to_string());
        assert_eq!(g.get_failure(), g.get_failure());
        assert_eq!(g.get_failure(), "e");
    }

    #[test]
    #[should_panic(expected = "on a `Failure`")]
    fn test_get_value_on_failure_panics() {
        let f = Failable::<i32, _>::failure(1u8);
        let _ = f.get_value();
    }

    #[test]
    #[should_panic(expected = "on a `Value`")]
    fn test_get_failure_on_value_panics() {
        let f = Failable::<_, u8>::value(1);
        let _ = f.get_failure();
    }

    #[test]
    fn test_visit_dispatches() {
        let v = Failable::<i32, &str>::value(2).visit(|v| v * 10, |_| 0);
        assert_eq!(v, 20);
        let f = Failable::<i32, &str>::failure("x").visit(|_| 0, |e| e.len() as i32);
        assert_eq!(f, 1);
    }

    #[test]
    fn test_map_and_map_failure() {
        let v = Failable::<_, String>::value(3).map(|x| x + 1);
        assert_eq!(v, Failable::Value(4));

        let f = Failable::<i32, _>::failure(3u8).map_failure(|e| e as u32 * 2);
        assert_eq!(f, Failable::Failure(6u32));
    }

    #[test]
    fn test_and_then_short_circuits() {
        let chained = Failable::<_, &str>::value(5).and_then(|x| {
            if x > 10 {
                Failable::value(x)
            } else {
                Failable::failure("too small")
            }
        });
        assert_eq!(chained, Failable::Failure("too small"));

        let failed = Failable::<i32, &str>::failure("first").and_then(|_| Failable::value(1));
        assert_eq!(failed, Failable::Failure("first"));
    }

    #[test]
    fn test_widen_uses_into() {
        let narrow = Failable::<(), u8>::failure(4);
        let wide: Failable<(), u64> = narrow.widen();
        assert_eq!(wide, Failable::Failure(4u64));
    }

    #[test]
    fn test_result_round_trip() {
        let f: Failable<i32, String> = Ok(1).into();
        assert_eq!(f, Failable::Value(1));
        let r: Result<i32, String> = Failable::failure("e".to_string()).into();
        assert_eq!(r, Err("e".to_string()));
    }

    #[test]
    fn test_as_ref_borrows() {
        let f = Failable::<String, String>::value("x".to_string());
        assert_eq!(f.as_ref(), Failable::Value(&"x".to_string()));
        assert!(f.holds_value());
    }
}
