//! Filing galleries into the library layout.
//!
//! [`organize_file`] moves one file to `base/category/author/filename` and
//! records where it went: the gallery row and the author's preferred
//! category. The author is the alias-resolved name from the gallery's
//! metadata, which comes from the store, the fetcher, or the filename (see
//! [`metadata::resolve`](crate::metadata::resolve)).
//!
//! The file system is the source of truth. Once a file has moved, a failed
//! store write is reported on the outcome ([`Record::Failed`]) and the move
//! is not undone.
//!
//! [`organize`] does the same for a batch, streaming an event per file.

pub mod error;
mod file;
mod stream;

pub use self::file::{Action, Organized, Record, organize_file};
pub use self::stream::{BatchSummary, OrganizeEvent, organize};
