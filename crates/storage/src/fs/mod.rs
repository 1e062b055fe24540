//! Filesystem access behind a trait, so that dry runs can swap in a wrapper
//! that never mutates anything.
//!
//! Unlike a rooted storage backend, every path here is a full path: candidate
//! files come from anywhere on disk and are moved into a library elsewhere.

mod local;
mod ro;

pub use self::local::LocalFilesystem;
pub use self::ro::ReadOnlyFilesystem;
use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;

pub type PathStream<'a> = Pin<Box<dyn Stream<Item = Result<PathBuf>> + Send + 'a>>;

#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Recursively stream every regular file below `root`.
    ///
    /// A missing `root` yields nothing rather than an error. Unreadable
    /// directories yield an error item and the walk carries on.
    fn walk<'a>(&'a self, root: &'a Path) -> PathStream<'a>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    async fn is_dir(&self, path: &Path) -> Result<bool>;

    /// Absolute path with all symlinks resolved. The path must exist.
    async fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Move a file to a destination that must not exist yet.
    ///
    /// Returns [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists) if
    /// anything occupies `to`; an existing file is never replaced. The
    /// destination's parent directory must exist.
    async fn move_new(&self, from: &Path, to: &Path) -> Result<()>;

    async fn delete(&self, path: &Path) -> Result<()>;
}
