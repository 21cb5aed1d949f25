//! Error handling for quickstep3d.
//!
//! The stepper is a pure computation: argument violations (a non-positive
//! timestep, malformed row counts) abort through `assert!`, while numerical
//! degeneracy detected mid-step is reported through the handler below so the
//! caller can decide how to react.
//!
//! Setting [`GLOBAL_ERROR_HANDLER`] can help you as the end user to react to
//! those errors.
//!
//! Its default behaviour is to [`panic!`].

use std::sync::OnceLock;

use log::warn;

/// Possible errors to handle through [`default_error_handler`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// A body's inertia tensor is not positive-definite in the world frame.
    DegenerateInertiaTensor(String),
    /// A constraint row's effective diagonal is not positive, so relaxing it
    /// would divide by zero (or worse).
    ZeroPivot(String),
}

/// A global error handler. This can be set at startup, as long as it is set
/// before any uses.
///
/// # Example
///
/// ```
/// use quickstep3d::error_handler::{GLOBAL_ERROR_HANDLER, warn};
/// assert!(GLOBAL_ERROR_HANDLER.set(Box::new(warn)).is_ok());
/// ```
pub static GLOBAL_ERROR_HANDLER: OnceLock<Box<dyn Fn(Error) + Sync + Send>> = OnceLock::new();

/// The default error handler. This defaults to [`panic()`].
#[inline]
pub fn default_error_handler() -> &'static dyn Fn(Error) {
    GLOBAL_ERROR_HANDLER.get_or_init(|| Box::new(panic))
}

/// Error handler that panics with the error.
#[track_caller]
#[inline(always)]
pub fn panic(error: Error) {
    panic!("Encountered an error:\n{:?}", error);
}

/// Error handler that logs the error at the `warn` level.
#[track_caller]
#[inline]
pub fn warn(error: Error) {
    warn!("Encountered an error:\n{:?}", error);
}
