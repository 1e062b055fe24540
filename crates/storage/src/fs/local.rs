use crate::error::{ErrorKind, Result};
use crate::fs::{Filesystem, PathStream};
use async_stream::stream;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tokio::io::AsyncWriteExt;

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// The real, local filesystem via `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    async fn process_entry(entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        // Follows symlinks, so a linked directory is descended into and a
        // broken link fails here.
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(WalkEntry::Skip),
            Err(e) => exn::bail!(Self::map_io_error(e, &path)),
        };
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(path));
        }
        Ok(WalkEntry::Skip)
    }

    /// Second half of a link-then-unlink move. If the source can't be
    /// removed the new link is taken back, so the file never ends up under
    /// both names.
    async fn unlink_source(from: &Path, to: &Path, removed: std::io::Result<()>) -> Result<()> {
        if let Err(e) = removed {
            if let Err(undo) = fs::remove_file(to).await {
                tracing::warn!(to = %to.display(), error = %undo, "Could not remove link after failed move");
            }
            exn::bail!(Self::map_io_error(e, from));
        }
        Ok(())
    }

    /// Cross-device (or link-less filesystem) fallback: copy into a freshly
    /// created destination, then remove the source.
    async fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
        let mut source = fs::File::open(from).await.map_err(|e| Self::map_io_error(e, from))?;
        let mut destination = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(to)
            .await
            .map_err(|e| Self::map_io_error(e, to))?;
        let copied = async {
            tokio::io::copy(&mut source, &mut destination).await?;
            destination.flush().await?;
            destination.sync_all().await
        }
        .await;
        if let Err(e) = copied {
            drop(destination);
            _ = fs::remove_file(to).await;
            exn::bail!(Self::map_io_error(e, to));
        }
        fs::remove_file(from).await.map_err(|e| Self::map_io_error(e, from))?;
        Ok(())
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    fn walk<'a>(&'a self, root: &'a Path) -> PathStream<'a> {
        let mut stack = vec![root.to_path_buf()];
        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'dirs; },
                    };
                    match Self::process_entry(entry).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(fs::try_exists(path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => exn::bail!(Self::map_io_error(e, path)),
        }
    }

    async fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(fs::canonicalize(path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        Ok(fs::create_dir_all(path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn move_new(&self, from: &Path, to: &Path) -> Result<()> {
        // A hard link fails on an existing destination, which a rename would
        // silently replace.
        match fs::hard_link(from, to).await {
            Ok(()) => Self::unlink_source(from, to, fs::remove_file(from).await).await,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                exn::bail!(ErrorKind::AlreadyExists(to.to_path_buf()))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => exn::bail!(Self::map_io_error(e, from)),
            Err(e) => {
                tracing::debug!(error = %e, from = %from.display(), "Hard link unavailable, copying instead");
                Self::copy_then_remove(from, to).await
            },
        }
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        Ok(fs::remove_file(path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}
