//! Combining detectors.

use std::fmt;
use std::marker::PhantomData;

use super::{Detected, Detector, Outcome};

/// A detector reporting a failure if any of its detectors does.
///
/// `Ds` is a tuple of detectors (up to 8), `F` the failure type every detector's failure
/// converts into.
///
/// Both steps visit the detectors in declaration order:
///
/// - `pre_run` collects every detector's state into a tuple;
/// - `post_run` runs *every* detector, even after a failure has been found, so side
///   effects like claiming a panic never depend on the position of a detector. The
///   failure reported is the first one found.
///
/// Put detectors for specific panic payloads before broader ones (like [`Always`]):
/// an earlier match shadows later ones.
///
/// [`Always`]: super::Always
pub struct Any<Ds, F> {
    detectors: Ds,
    _failure: PhantomData<fn() -> F>,
}

/// Combine a tuple of detectors into one.
///
/// # Example
///
/// ```
/// use resilient::detector::{any_of, returns, Detected, Detector, Outcome, ReturnedFailureValue};
///
/// let detector = any_of::<ReturnedFailureValue, _>((returns(-1), returns(0)));
///
/// let state = Detector::<i32>::pre_run(&detector);
/// let value = 0;
/// let detected = detector.post_run(state, &mut Outcome::returned(&value));
/// assert_eq!(detected, Detected::Failure(ReturnedFailureValue));
/// ```
pub fn any_of<F, Ds>(detectors: Ds) -> Any<Ds, F> {
    Any::new(detectors)
}

impl<Ds, F> Any<Ds, F> {
    /// Combine a tuple of detectors.
    pub fn new(detectors: Ds) -> Self {
        Self {
            detectors,
            _failure: PhantomData,
        }
    }

    /// The combined detectors.
    pub fn detectors(&self) -> &Ds {
        &self.detectors
    }
}

impl<Ds: Clone, F> Clone for Any<Ds, F> {
    fn clone(&self) -> Self {
        Self::new(self.detectors.clone())
    }
}

impl<Ds: fmt::Debug, F> fmt::Debug for Any<Ds, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Any")
            .field("detectors", &self.detectors)
            .finish()
    }
}

macro_rules! impl_any_detector {
    ($(($D:ident, $S:ident, $idx:tt)),+) => {
        impl<T, F, $($D),+> Detector<T> for Any<($($D,)+), F>
        where
            $($D: Detector<T>, $D::Failure: Into<F>,)+
        {
            type State = ($($D::State,)+);
            type Failure = F;

            fn pre_run(&self) -> Self::State {
                ($(self.detectors.$idx.pre_run(),)+)
            }

            #[allow(non_snake_case)]
            fn post_run(&self, state: Self::State, outcome: &mut Outcome<'_, T>) -> Detected<F> {
                let ($($S,)+) = state;
                let mut detected = Detected::NoFailure;
                $(
                    let current = self.detectors.$idx.post_run($S, outcome).map(Into::into);
                    detected = detected.or(current);
                )+
                detected
            }
        }
    };
}

impl_any_detector!((D1, S1, 0));
impl_any_detector!((D1, S1, 0), (D2, S2, 1));
impl_any_detector!((D1, S1, 0), (D2, S2, 1), (D3, S3, 2));
impl_any_detector!((D1, S1, 0), (D2, S2, 1), (D3, S3, 2), (D4, S4, 3));
impl_any_detector!(
    (D1, S1, 0),
    (D2, S2, 1),
    (D3, S3, 2),
    (D4, S4, 3),
    (D5, S5, 4)
);
impl_any_detector!(
    (D1, S1, 0),
    (D2, S2, 1),
    (D3, S3, 2),
    (D4, S4, 3),
    (D5, S5, 4),
    (D6, S6, 5)
);
impl_any_detector!(
    (D1, S1, 0),
    (D2, S2, 1),
    (D3, S3, 2),
    (D4, S4, 3),
    (D5, S5, 4),
    (D6, S6, 5),
    (D7, S7, 6)
);
impl_any_detector!(
    (D1, S1, 0),
    (D2, S2, 1),
    (D3, S3, 2),
    (D4, S4, 3),
    (D5, S5, 4),
    (D6, S6, 5),
    (D7, S7, 6),
    (D8, S8, 7)
);
