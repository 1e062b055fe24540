//! Configuration error types.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("unsupported configuration format (expected toml, yaml or json): {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    #[display("could not read configuration")]
    Parse,
    #[display("invalid value for `{_0}`: {_1}")]
    InvalidValue(#[error(not(source))] &'static str, #[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
