//! Error types for the crate.
//!
//! Every fallible operation returns a [`Result`]; the error carries both a
//! human-readable message and a stable [`ErrorKind`] code for callers that
//! dispatch on failure class rather than message text.

use core::fmt;

/// Stable codes describing [`Error`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An argument was malformed, out of range or inconsistent.
    InvalidInput,
    /// No clustering satisfying the requested constraints exists.
    NoSolution,
    /// A distance-search backend could not answer a query.
    DistSearchError,
    /// The requested combination of options is not implemented.
    NotImplemented,
    /// An input exceeds the representable problem size.
    TooLargeProblem,
}

impl ErrorKind {
    /// Return the stable machine-readable representation of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::NoSolution => "NO_SOLUTION",
            Self::DistSearchError => "DIST_SEARCH_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::TooLargeProblem => "TOO_LARGE_PROBLEM",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error produced by a clustering, digraph or distance-search operation.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An argument was malformed, out of range or inconsistent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No clustering satisfying the requested constraints exists.
    #[error("no solution: {0}")]
    NoSolution(String),
    /// A distance-search backend could not answer a query.
    #[error("distance search failed: {0}")]
    DistSearch(String),
    /// The requested combination of options is not implemented.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// An input exceeds the representable problem size.
    #[error("too large problem: {0}")]
    TooLarge(String),
}

impl Error {
    /// Retrieve the stable [`ErrorKind`] for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NoSolution(_) => ErrorKind::NoSolution,
            Self::DistSearch(_) => ErrorKind::DistSearchError,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
            Self::TooLarge(_) => ErrorKind::TooLargeProblem,
        }
    }

    /// Shorthand constructor for [`Error::InvalidInput`].
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Shorthand constructor for [`Error::NoSolution`].
    pub(crate) fn no_solution(msg: impl Into<String>) -> Self {
        Self::NoSolution(msg.into())
    }

    /// Shorthand constructor for [`Error::TooLarge`].
    pub(crate) fn too_large(msg: impl Into<String>) -> Self {
        Self::TooLarge(msg.into())
    }
}

/// Convenient alias for results returned by this crate.
pub type Result<T> = core::result::Result<T, Error>;
