//! Guessing where a file should go before asking the user.

use crate::Context;
use crate::alias::canonical_author;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelver_cache::Repository;
use shelver_extract::{extract_author, extract_id, file_name};
use std::path::Path;
use tracing::instrument;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prediction {
    pub category: Option<String>,
    pub author: Option<String>,
    /// The gallery has been organized before; both fields come from the store.
    pub known: bool,
}

/// Predict the category and author for a file.
///
/// A gallery that was organized before gets its stored category and author.
/// Otherwise the author comes from the filename and the category from what
/// that author (after alias resolution) was last filed under. The returned
/// author is the name as written in the filename; it may be `Some` while the
/// category is `None`.
#[instrument(level = "debug", skip(cache, ctx), fields(path = %path.display()))]
pub async fn predict(cache: &Repository, ctx: &Context, path: &Path) -> Result<Prediction> {
    let filename = file_name(path).or_raise(|| ErrorKind::Predict)?;
    if let Some(id) = extract_id(filename)
        && let Some(gallery) = cache.get_gallery(id).await.or_raise(|| ErrorKind::Predict)?
    {
        return Ok(Prediction { category: Some(gallery.category), author: Some(gallery.author), known: true });
    }
    let Some(author) = extract_author(filename, &ctx.sentinel) else {
        return Ok(Prediction::default());
    };
    let primary = canonical_author(cache, &author).await.or_raise(|| ErrorKind::Predict)?;
    let category = cache.get_author_category(&primary).await.or_raise(|| ErrorKind::Predict)?;
    Ok(Prediction { category, author: Some(author), known: false })
}
