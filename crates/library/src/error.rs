//! Library Error Types
//!
//! Each public entry point raises one of these on top of the error tree of
//! the module (or crate) that actually failed.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not organize file")]
    Organize,
    #[display("could not resolve gallery metadata")]
    Metadata,
    #[display("could not predict category")]
    Predict,
    #[display("alias lookup or registration failed")]
    Alias,
    #[display("category lookup or registration failed")]
    Category,
    #[display("candidate discovery failed")]
    Candidates,
    /// An external program (metadata fetcher, search index) is missing or
    /// unusable.
    #[display("external program unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
