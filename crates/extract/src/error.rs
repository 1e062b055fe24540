//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The path has no final component, or it isn't valid UTF-8.
    #[display("unusable filename: {}", _0.display())]
    InvalidFilename(#[error(not(source))] PathBuf),
    /// A sentinel needs at least one non-blank spelling.
    #[display("no-author sentinel has no spellings")]
    EmptySentinel,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Filenames don't change between attempts.
        false
    }
}
