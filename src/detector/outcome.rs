//! What happened when a callable was invoked.

use std::any::Any;
use std::fmt;

/// The raw result of one invocation, before any classification.
///
/// An `Outcome` either borrows the value the callable returned, or borrows the payload
/// of the panic it raised together with a *consumed* flag. A detector that wants to own
/// the handling of a panic calls [`consume_panic`](Outcome::consume_panic); a panic that
/// no detector consumed is resumed unchanged by the [`Task`](crate::Task).
///
/// Outcomes live for the duration of a single `post_run` call.
///
/// # Examples
///
/// ```
/// use resilient::detector::Outcome;
///
/// let value = 5;
/// let outcome = Outcome::returned(&value);
/// assert!(!outcome.is_panic());
/// assert_eq!(outcome.value(), &5);
///
/// let payload: Box<dyn std::any::Any + Send> = Box::new("disk on fire");
/// let mut outcome = Outcome::<i32>::panicked(&*payload);
/// assert_eq!(outcome.panic_message(), Some("disk on fire"));
/// outcome.consume_panic();
/// assert!(outcome.is_consumed());
/// ```
pub struct Outcome<'a, T> {
    captured: Captured<'a, T>,
}

enum Captured<'a, T> {
    Returned(&'a T),
    Panicked {
        payload: &'a (dyn Any + Send),
        consumed: bool,
    },
}

impl<'a, T> Outcome<'a, T> {
    /// An outcome for a callable that returned normally.
    pub fn returned(value: &'a T) -> Self {
        Self {
            captured: Captured::Returned(value),
        }
    }

    /// An outcome for a callable that panicked with `payload`.
    pub fn panicked(payload: &'a (dyn Any + Send)) -> Self {
        Self {
            captured: Captured::Panicked {
                payload,
                consumed: false,
            },
        }
    }

    /// Returns `true` if the callable panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self.captured, Captured::Panicked { .. })
    }

    /// The value returned by the callable.
    ///
    /// # Panics
    ///
    /// Panics if the callable panicked.
    #[track_caller]
    pub fn value(&self) -> &'a T {
        match self.captured {
            Captured::Returned(value) => value,
            Captured::Panicked { .. } => panic!("called `Outcome::value()` on a panic outcome"),
        }
    }

    /// The payload of the panic raised by the callable.
    ///
    /// # Panics
    ///
    /// Panics if the callable returned normally.
    #[track_caller]
    pub fn payload(&self) -> &'a (dyn Any + Send) {
        match self.captured {
            Captured::Panicked { payload, .. } => payload,
            Captured::Returned(_) => panic!("called `Outcome::payload()` on a returned outcome"),
        }
    }

    /// Claim the panic, so it is reported through the detected failure instead of
    /// being resumed.
    ///
    /// # Panics
    ///
    /// Panics if the callable returned normally.
    #[track_caller]
    pub fn consume_panic(&mut self) {
        match &mut self.captured {
            Captured::Panicked { consumed, .. } => *consumed = true,
            Captured::Returned(_) => {
                panic!("called `Outcome::consume_panic()` on a returned outcome")
            }
        }
    }

    /// Returns `true` once some detector has claimed the panic.
    pub fn is_consumed(&self) -> bool {
        matches!(self.captured, Captured::Panicked { consumed: true, .. })
    }

    /// The panic payload as a `P`, if the callable panicked with one.
    pub fn downcast_payload<P: Any>(&self) -> Option<&'a P> {
        match self.captured {
            Captured::Panicked { payload, .. } => payload.downcast_ref::<P>(),
            Captured::Returned(_) => None,
        }
    }

    /// The panic message, for panics raised with a string literal or a formatted
    /// message.
    pub fn panic_message(&self) -> Option<&'a str> {
        self.downcast_payload::<&'static str>()
            .copied()
            .or_else(|| self.downcast_payload::<String>().map(String::as_str))
    }
}

impl<T: fmt::Debug> fmt::Debug for Outcome<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.captured {
            Captured::Returned(value) => f.debug_tuple("Returned").field(value).finish(),
            Captured::Panicked { consumed, .. } => f
                .debug_struct("Panicked")
                .field("message", &self.panic_message())
                .field("consumed", consumed)
                .finish(),
        }
    }
}
