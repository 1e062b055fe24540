//! Read-only filesystem wrapper used for dry runs.

use crate::FsHandle;
use crate::error::Result;
use crate::fs::{Filesystem, PathStream};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Wraps another filesystem and drops every mutating operation, logging an
/// [`info event`](tracing::Event) and reporting success instead.
#[derive(Clone)]
pub struct ReadOnlyFilesystem {
    inner: FsHandle,
}
impl ReadOnlyFilesystem {
    pub fn new(inner: FsHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Filesystem for ReadOnlyFilesystem {
    fn walk<'a>(&'a self, root: &'a Path) -> PathStream<'a> {
        self.inner.walk(root)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        self.inner.is_dir(path).await
    }

    async fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.inner.canonicalize(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), "Skipping directory creation during dry run");
        Ok(())
    }

    async fn move_new(&self, from: &Path, to: &Path) -> Result<()> {
        tracing::info!(from = %from.display(), to = %to.display(), "Dry run: would move");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Dry run: would delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalFilesystem;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_writes_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("file.cbz");
        std::fs::write(&file, b"x").unwrap();
        let fs = ReadOnlyFilesystem::new(Arc::new(LocalFilesystem));
        fs.move_new(&file, &temp_dir.path().join("moved.cbz")).await.unwrap();
        fs.create_dir_all(&temp_dir.path().join("sub")).await.unwrap();
        fs.delete(&file).await.unwrap();
        assert!(fs.exists(&file).await.unwrap());
        assert!(!temp_dir.path().join("moved.cbz").exists());
        assert!(!temp_dir.path().join("sub").exists());
    }
}
