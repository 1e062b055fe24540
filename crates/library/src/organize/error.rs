//! Error types for the [`organize`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An organize error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for organize operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single file could not be organized.
///
/// Destination collisions are not errors; see
/// [`Action::Skipped`](super::Action::Skipped).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No gallery id could be read from the filename.
    #[display("no gallery id in {}", _0.display())]
    Identity(#[error(not(source))] PathBuf),
    /// Metadata lookup failed.
    #[display("metadata unavailable")]
    Metadata,
    /// Strict mode is on and only filename-derived metadata was available.
    #[display("no fetched or stored metadata for gallery {_0}")]
    Unsourced(#[error(not(source))] u64),
    /// A store read needed before moving failed.
    #[display("store lookup failed")]
    Cache,
    #[display("file system operation failed")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Cache)
    }
}
