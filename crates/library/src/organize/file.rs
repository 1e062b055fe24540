use crate::Context;
use crate::alias::canonical_author;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::metadata;
use crate::organize::error::{ErrorKind as OrganizeErrorKind, Result as OrganizeResult};
use exn::{OptionExt, ResultExt};
use shelver_cache::{GalleryRecord, Repository};
use shelver_extract::{Source, extract_id, file_name};
use shelver_storage::{Placement, Relocator};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::instrument;

/// What happened to the store after a file was placed.
#[derive(Debug)]
pub enum Record {
    /// Gallery row and author setting were written.
    Written,
    /// The store already said exactly this, or writes are disabled (dry run).
    Unchanged,
    /// The file is in place but the store could not be updated. Future
    /// predictions for this gallery may be wrong until it is organized again.
    Failed(shelver_cache::error::Error),
}

/// A file that ended up at its canonical location.
#[derive(Debug)]
pub struct Organized {
    pub id: u64,
    /// Canonical (alias-resolved) author the file was filed under.
    pub author: String,
    pub category: String,
    pub path: PathBuf,
    /// Where the metadata came from.
    pub source: Source,
    pub record: Record,
}

/// The outcome of organizing a single file.
#[derive(Debug)]
pub enum Action {
    Moved(Organized),
    /// The file already was at its canonical location.
    AlreadyInPlace(Organized),
    /// A different file occupies the destination. Neither file nor the store
    /// was touched.
    Skipped { path: PathBuf, occupied: PathBuf },
}
impl Action {
    /// Where the file is now.
    pub fn path(&self) -> &Path {
        match self {
            Self::Moved(o) | Self::AlreadyInPlace(o) => &o.path,
            Self::Skipped { path, .. } => path,
        }
    }

    pub fn organized(&self) -> Option<&Organized> {
        match self {
            Self::Moved(o) | Self::AlreadyInPlace(o) => Some(o),
            Self::Skipped { .. } => None,
        }
    }
}

/// Move `path` to `base_dir/category/author/filename` and record it.
///
/// 1. The gallery id is read from the filename.
/// 2. Metadata is resolved; in strict mode a record synthesized from the
///    filename is refused and the file is not touched.
/// 3. The metadata author is resolved through the alias table.
/// 4. The file is placed. A collision is an [`Action::Skipped`].
/// 5. The gallery row (with `category`, not the metadata's own category) and
///    the author's preferred category are written together.
///
/// # Errors
/// Returns [`Exn<LibraryErrorKind::Organize>`](LibraryErrorKind::Organize)
/// raised from an inner [`Exn<OrganizeErrorKind>`](OrganizeErrorKind). A
/// store failure after the move is not an error; see [`Record::Failed`].
pub async fn organize_file(
    relocator: &Relocator,
    cache: &Repository,
    ctx: &Context,
    path: &Path,
    category: &str,
    base_dir: &Path,
) -> LibraryResult<Action> {
    organize_file_inner(relocator, cache, ctx, path, category, base_dir)
        .await
        .or_raise(|| LibraryErrorKind::Organize)
}

#[instrument(level = "debug", skip(relocator, cache, ctx), fields(path = %path.display()))]
pub(crate) async fn organize_file_inner(
    relocator: &Relocator,
    cache: &Repository,
    ctx: &Context,
    path: &Path,
    category: &str,
    base_dir: &Path,
) -> OrganizeResult<Action> {
    let filename = file_name(path).or_raise(|| OrganizeErrorKind::Identity(path.to_path_buf()))?;
    let id = extract_id(filename).ok_or_raise(|| OrganizeErrorKind::Identity(path.to_path_buf()))?;

    let metadata = metadata::resolve(cache, ctx, id, filename, category)
        .await
        .or_raise(|| OrganizeErrorKind::Metadata)?;
    if ctx.strict && !metadata.is_sourced() {
        exn::bail!(OrganizeErrorKind::Unsourced(id));
    }
    let author = canonical_author(cache, &metadata.author).await.or_raise(|| OrganizeErrorKind::Cache)?;
    if author != metadata.author {
        tracing::debug!(id, observed = %metadata.author, %author, "Author resolved through alias");
    }

    let placement = relocator
        .place_in_category(path, category, &author, base_dir)
        .await
        .or_raise(|| OrganizeErrorKind::Storage)?;
    let destination = match &placement {
        Placement::Collision(occupied) => {
            return Ok(Action::Skipped { path: path.to_path_buf(), occupied: occupied.clone() });
        },
        Placement::Moved(destination) | Placement::AlreadyInPlace(destination) => destination.clone(),
    };

    let gallery = GalleryRecord {
        id,
        title: metadata.title,
        original_filename: filename.to_string(),
        current_path: destination.clone(),
        author: author.clone(),
        category: category.trim().to_string(),
        series: metadata.series,
        tags: metadata.tags,
        language: metadata.language,
        imported_at: UtcDateTime::now(),
    };
    let record = match cache.record_organized(&gallery).await {
        Ok(true) => Record::Written,
        Ok(false) => Record::Unchanged,
        Err(e) => {
            tracing::error!(id, path = %destination.display(), error = ?e, "File moved but store not updated");
            Record::Failed(e)
        },
    };
    let organized = Organized {
        id,
        author,
        category: gallery.category,
        path: destination,
        source: metadata.source,
        record,
    };
    Ok(match placement {
        Placement::AlreadyInPlace(_) => Action::AlreadyInPlace(organized),
        _ => Action::Moved(organized),
    })
}
