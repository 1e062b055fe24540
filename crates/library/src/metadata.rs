//! Metadata resolution: store, then fetcher, then the filename.

use crate::Context;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelver_cache::Repository;
use shelver_extract::{FetchPayload, MetadataRecord, extract_author};
use tracing::instrument;

/// Resolve metadata for a gallery.
///
/// 1. A stored gallery wins; its category is whatever it was last filed
///    under.
/// 2. Otherwise the fetcher is asked; a valid payload is normalized.
/// 3. Otherwise a record is synthesized from `filename`, filed under
///    `fallback_category`.
///
/// Only a store failure is an error. Check
/// [`MetadataRecord::is_sourced`] to tell synthesized records apart.
pub async fn resolve(
    cache: &Repository,
    ctx: &Context,
    id: u64,
    filename: &str,
    fallback_category: &str,
) -> Result<MetadataRecord> {
    resolve_inner(cache, ctx, id, filename, fallback_category)
        .await
        .or_raise(|| ErrorKind::Metadata)
}

#[instrument(level = "debug", skip(cache, ctx))]
async fn resolve_inner(
    cache: &Repository,
    ctx: &Context,
    id: u64,
    filename: &str,
    fallback_category: &str,
) -> shelver_cache::error::Result<MetadataRecord> {
    if let Some(stored) = cache.get_gallery(id).await? {
        tracing::debug!(id, "Metadata found in store");
        return Ok(stored.to_metadata());
    }
    match ctx.fetcher.fetch(id).await {
        FetchPayload::Valid(raw) => {
            tracing::debug!(id, "Metadata fetched");
            return Ok(MetadataRecord::from_fetched(id, raw, filename, &ctx.sentinel));
        },
        FetchPayload::Error(reason) => tracing::warn!(id, %reason, "Metadata fetch failed, using filename"),
        FetchPayload::Malformed => tracing::warn!(id, "Metadata fetch returned nothing usable, using filename"),
    }
    let author = extract_author(filename, &ctx.sentinel);
    Ok(MetadataRecord::synthesized(id, filename, author, fallback_category, &ctx.sentinel))
}
