//! Internal logging facade.
//!
//! Forwards to `tracing` when the `tracing` feature is enabled and expands to nothing
//! otherwise, so call sites don't need their own `#[cfg]`.

macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        ::tracing::debug!($($arg)*);
    }};
}

macro_rules! warning {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        ::tracing::warn!($($arg)*);
    }};
}

macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        ::tracing::error!($($arg)*);
    }};
}

pub(crate) use debug;
pub(crate) use error;
pub(crate) use trace;
pub(crate) use warning;
