//! Error handling for sharecast.
//!
//! Errors carry a coarse [`ErrorKind`] modelled after gRPC status codes plus
//! the underlying cause. Only the fallible edges of the crate return them:
//! configuration loading, controller construction, argument validation and
//! wire decoding.
//!
//! Playback failures are deliberately *not* errors in this sense. A backend
//! that fails to load a source reports a [`VideoError`](crate::backend::VideoError),
//! which the controller turns into a listener notification and, where
//! applicable, a retry.
//!
//! # Example
//!
//! ```rust
//! use sharecast::error::{Error, ErrorKind, Result};
//!
//! fn check_speed(speed: f64) -> Result<()> {
//!     if speed <= 0.0 {
//!         return Err(Error::invalid_argument(format!("speed must be positive, got {speed}")));
//!     }
//!     Ok(())
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
    /// Attempts to downcast the underlying error to a concrete type.
    ///
    /// # Returns
    /// * `Some(&E)` - If the underlying error is of type `E`
    /// * `None` - If the underlying error is not of type `E`
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Standard result type for sharecast operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories based on gRPC status codes.
///
/// Only the categories that the controller and its collaborators can
/// actually produce are represented.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum ErrorKind {
    /// The operation was interrupted, e.g. by a shutdown signal.
    #[error("operation was cancelled")]
    Cancelled = 1,

    /// The error doesn't fit any other category.
    #[error("unknown error")]
    Unknown = 2,

    /// An argument failed validation: negative speed, inverted repeat
    /// window, malformed configuration value.
    #[error("invalid argument specified")]
    InvalidArgument = 3,

    /// A referenced resource does not exist, e.g. a configuration file or
    /// a backend for the requested player kind.
    #[error("not found")]
    NotFound = 5,

    /// Something was registered twice, e.g. two backends for one player kind.
    #[error("attempt to create what already exists")]
    AlreadyExists = 6,

    /// The caller lacks permission.
    #[error("permission denied")]
    PermissionDenied = 7,

    /// The operation is not valid in the current state.
    #[error("invalid state")]
    FailedPrecondition = 9,

    /// An internal invariant was violated.
    #[error("internal error")]
    Internal = 13,

    /// Data could not be read back, e.g. a truncated configuration file.
    #[error("unrecoverable data loss or corruption")]
    DataLoss = 15,
}

impl Error {
    /// Creates a new error with specified kind and details.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::new(ErrorKind::NotFound, "no backend for player kind");
    /// assert_eq!(err.kind, ErrorKind::NotFound);
    /// ```
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Creates an error for interrupted operations.
    pub fn cancelled<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Cancelled, error)
    }

    /// Creates an error for duplicate registrations.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::already_exists("backend for video already registered");
    /// assert_eq!(err.kind, ErrorKind::AlreadyExists);
    /// ```
    pub fn already_exists<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::AlreadyExists, error)
    }

    /// Creates an error for data corruption or loss.
    pub fn data_loss<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::DataLoss, error)
    }

    /// Creates an error for operations that failed due to current state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::failed_precondition("controller has no backends");
    /// assert_eq!(err.kind, ErrorKind::FailedPrecondition);
    /// ```
    pub fn failed_precondition<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::FailedPrecondition, error)
    }

    /// Creates an error for internal errors.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }

    /// Creates an error for invalid arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::invalid_argument("repeat window must start before it ends");
    /// assert_eq!(err.kind, ErrorKind::InvalidArgument);
    /// ```
    pub fn invalid_argument<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::InvalidArgument, error)
    }

    /// Creates an error for missing resources.
    pub fn not_found<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::NotFound, error)
    }

    /// Creates an error for permission denied conditions.
    pub fn permission_denied<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::PermissionDenied, error)
    }

    /// Creates an error for unknown errors.
    pub fn unknown<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unknown, error)
    }
}

/// Returns the underlying error source.
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats the error as "{kind}: {details}".
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

/// Converts IO errors into appropriate error kinds.
///
/// Maps standard IO errors to their logical equivalents:
/// * `NotFound` -> `NotFound`
/// * `PermissionDenied` -> `PermissionDenied`
/// * `UnexpectedEof` -> `DataLoss`
/// * `InvalidInput` / `InvalidData` -> `InvalidArgument`
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied => Self::permission_denied(err),
            AlreadyExists => Self::already_exists(err),
            Interrupted => Self::cancelled(err),
            UnexpectedEof => Self::data_loss(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            _ => Self::unknown(err),
        }
    }
}

/// Converts JSON errors through IO error mapping.
///
/// Syntax and type mismatches in a received state broadcast end up as
/// `InvalidArgument`, truncated payloads as `DataLoss`.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        std::io::Error::from(err).into()
    }
}

/// Converts TOML deserialization errors to `InvalidArgument`.
impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::invalid_argument(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_kinds() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err: Error = std::io::Error::from(std::io::ErrorKind::InvalidData).into();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn display_includes_kind_and_details() {
        let err = Error::invalid_argument("speed must be positive");
        assert_eq!(
            err.to_string(),
            "invalid argument specified: speed must be positive"
        );
    }

    #[test]
    fn json_errors_map_to_kinds() {
        let err: Error = serde_json::from_str::<Vec<u32>>("[1").unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::DataLoss);

        let err: Error = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }
}
