//! Moving files to trash and into the category/author layout.

use crate::FsHandle;
use crate::error::{ErrorKind, Result};
use crate::sanitize::sanitize_segment;
use exn::{OptionExt, ResultExt};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::instrument;

/// Name of the per-directory trash folder.
pub const TRASH_DIR_NAME: &str = "_trash";
// Upper bound on disambiguated trash names tried for a single file.
const MAX_TRASH_ATTEMPTS: u32 = 1000;

/// Where trashed files go, and whether they stay there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrashPolicy {
    /// Shared trash directory. `None` means a `_trash` folder next to each file.
    pub dir: Option<PathBuf>,
    /// Delete the file right after it has been moved to the trash.
    pub purge: bool,
}

/// What happened to a file sent to the trash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    Trashed(PathBuf),
    /// Moved to the given trash path, then deleted.
    Purged(PathBuf),
}

/// Outcome of placing a file into the library layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Moved(PathBuf),
    /// The file already sits at its canonical location.
    AlreadyInPlace(PathBuf),
    /// A different file occupies the destination. Nothing was touched.
    Collision(PathBuf),
}
impl Placement {
    pub fn path(&self) -> &Path {
        match self {
            Self::Moved(p) | Self::AlreadyInPlace(p) | Self::Collision(p) => p,
        }
    }

    /// `true` when the file ended up (or already was) at the destination.
    pub fn is_placed(&self) -> bool {
        !matches!(self, Self::Collision(_))
    }
}

/// Performs every file move the organizer and the duplicate cleaner make.
///
/// Files are never overwritten: trash moves pick a fresh name on collision,
/// placements report the collision and leave both files alone.
#[derive(Clone)]
pub struct Relocator {
    fs: FsHandle,
    trash: TrashPolicy,
}
impl Relocator {
    pub fn new(fs: FsHandle, trash: TrashPolicy) -> Self {
        Self { fs, trash }
    }

    pub fn filesystem(&self) -> &FsHandle {
        &self.fs
    }

    /// The shared trash directory, if one is configured.
    pub fn trash_dir(&self) -> Option<&Path> {
        self.trash.dir.as_deref()
    }

    fn absolute(path: &Path) -> Result<PathBuf> {
        std::path::absolute(path).or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))
    }

    fn trash_dir_for(&self, path: &Path) -> Result<PathBuf> {
        match &self.trash.dir {
            Some(dir) => Self::absolute(dir),
            None => {
                let parent = path.parent().ok_or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))?;
                Ok(parent.join(TRASH_DIR_NAME))
            },
        }
    }

    /// `name`, then `{stem}_{unix_ts}{.ext}`, then `{stem}_{unix_ts}_{n}{.ext}`.
    fn trash_names(name: &Path) -> impl Iterator<Item = OsString> + '_ {
        let timestamp = UtcDateTime::now().unix_timestamp();
        let stem = name.file_stem().unwrap_or(name.as_os_str());
        let extension = name.extension();
        let build = move |suffix: String| {
            let mut candidate = stem.to_os_string();
            candidate.push(suffix);
            if let Some(ext) = extension {
                candidate.push(".");
                candidate.push(ext);
            }
            candidate
        };
        std::iter::once(name.as_os_str().to_os_string())
            .chain(std::iter::once(build(format!("_{timestamp}"))))
            .chain((1..MAX_TRASH_ATTEMPTS).map(move |n| build(format!("_{timestamp}_{n}"))))
    }

    /// Move a file into the trash, creating the trash directory if needed.
    ///
    /// A same-named file already in the trash is kept; the incoming file gets
    /// a timestamp suffix before its extension. With
    /// [`purge`](TrashPolicy::purge) set the file is deleted once moved.
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub async fn move_to_trash(&self, path: &Path) -> Result<Disposal> {
        let path = Self::absolute(path)?;
        let name = PathBuf::from(path.file_name().ok_or_raise(|| ErrorKind::InvalidPath(path.clone()))?);
        let trash_dir = self.trash_dir_for(&path)?;
        self.fs.create_dir_all(&trash_dir).await?;
        for candidate in Self::trash_names(&name) {
            let destination = trash_dir.join(candidate);
            if self.fs.exists(&destination).await? {
                continue;
            }
            match self.fs.move_new(&path, &destination).await {
                Ok(()) => {},
                // Lost a race against another worker for the same name.
                Err(e) if matches!(&*e, ErrorKind::AlreadyExists(_)) => continue,
                Err(e) => return Err(e),
            }
            tracing::info!(from = %path.display(), to = %destination.display(), "Moved to trash");
            if self.trash.purge {
                self.fs.delete(&destination).await?;
                tracing::info!(path = %destination.display(), "Purged");
                return Ok(Disposal::Purged(destination));
            }
            return Ok(Disposal::Trashed(destination));
        }
        exn::bail!(ErrorKind::AlreadyExists(trash_dir.join(name)))
    }

    /// Canonical library location for a file: `base/category/author/filename`,
    /// with both directory names sanitized.
    pub fn destination_for(path: &Path, category: &str, author: &str, base_dir: &Path) -> Result<PathBuf> {
        let name = path.file_name().ok_or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))?;
        Ok(Self::absolute(base_dir)?
            .join(sanitize_segment(category)?)
            .join(sanitize_segment(author)?)
            .join(name))
    }

    /// Move a file to `base_dir/category/author/filename`.
    ///
    /// Calling this again for a file that is already in place is a no-op
    /// reported as [`Placement::AlreadyInPlace`]. A different file at the
    /// destination is reported as [`Placement::Collision`] and neither file
    /// is touched.
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub async fn place_in_category(
        &self,
        path: &Path,
        category: &str,
        author: &str,
        base_dir: &Path,
    ) -> Result<Placement> {
        let destination = Self::destination_for(path, category, author, base_dir)?;
        let source = self.fs.canonicalize(path).await?;
        if self.fs.exists(&destination).await? {
            if self.fs.canonicalize(&destination).await? == source {
                tracing::debug!(path = %destination.display(), "Already in place");
                return Ok(Placement::AlreadyInPlace(destination));
            }
            tracing::warn!(from = %path.display(), to = %destination.display(), "Destination occupied, skipping");
            return Ok(Placement::Collision(destination));
        }
        if let Some(parent) = destination.parent() {
            self.fs.create_dir_all(parent).await?;
        }
        match self.fs.move_new(&source, &destination).await {
            Ok(()) => {
                tracing::info!(from = %path.display(), to = %destination.display(), "Moved");
                Ok(Placement::Moved(destination))
            },
            Err(e) if matches!(&*e, ErrorKind::AlreadyExists(_)) => {
                tracing::warn!(to = %destination.display(), "Destination appeared during move, skipping");
                Ok(Placement::Collision(destination))
            },
            Err(e) => Err(e),
        }
    }
}
