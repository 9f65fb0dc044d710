//! Error types for linkstore
//!
//! This module defines the error taxonomy shared by the client and storage layers.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors can be wrapped with contextual messages via [`ResultExt::context`].
//! Wrapping never hides the underlying condition: [`Error::kind`] walks the
//! wrap chain, so a `NotFound` buried under three layers of context still
//! reports `ErrorKind::NotFound`.

use thiserror::Error;

/// Result type alias for linkstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of an [`Error`], independent of any context wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Key or list element is absent
    NotFound,
    /// Value could not be encoded or decoded
    Serialization,
    /// Backend rejected or failed the command
    Backend,
    /// Commit requested on a handle with no open transaction
    NoTransaction,
    /// Caller cancelled the context
    Cancelled,
    /// Context deadline passed before the call completed
    DeadlineExceeded,
}

/// Error types for the key-value client
#[derive(Debug, Error)]
pub enum Error {
    /// Key or list element is absent
    #[error("no data")]
    NotFound,

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend command failure
    #[error("backend error: {0}")]
    Backend(String),

    /// No open transaction on the handle
    #[error("no open transaction")]
    NoTransaction,

    /// Context was cancelled
    #[error("context cancelled")]
    Cancelled,

    /// Context deadline exceeded
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Error wrapped with a contextual message
    #[error("{context}: {source}")]
    Context {
        /// What was being attempted
        context: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }

    /// Wrap this error with a contextual message
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Kind of the innermost error in the wrap chain
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound => ErrorKind::NotFound,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Backend(_) => ErrorKind::Backend,
            Error::NoTransaction => ErrorKind::NoTransaction,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Error::Context { source, .. } => source.kind(),
        }
    }

    /// Check whether this error (or anything it wraps) is of the given kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// Shorthand for `is(ErrorKind::NotFound)`
    pub fn is_not_found(&self) -> bool {
        self.is(ErrorKind::NotFound)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Extension for attaching context to results
pub trait ResultExt<T> {
    /// Wrap the error (if any) with a contextual message
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }
}
