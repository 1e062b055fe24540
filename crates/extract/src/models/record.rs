use crate::identity::Sentinel;
use crate::payload::RawGallery;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Category reported when the fetcher doesn't say what kind of gallery it is.
pub const UNKNOWN_CATEGORY: &str = "Unknown";
/// Language recorded for synthesized records.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Where a [`MetadataRecord`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Read back from the persistent store. The category is whatever the
    /// gallery was last filed under, not necessarily what the caller wants now.
    Store,
    /// Normalized from a successful external fetch.
    Fetched,
    /// Made up from the filename because nothing better was available.
    Synthesized,
}
impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Store => write!(f, "store"),
            Self::Fetched => write!(f, "fetched"),
            Self::Synthesized => write!(f, "synthesized"),
        }
    }
}

/// Canonical metadata for one gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub id: u64,
    pub title: String,
    /// Observed author, before alias resolution.
    pub author: String,
    pub category: String,
    pub series: Option<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub source: Source,
}
impl MetadataRecord {
    /// `true` unless the record was synthesized from the filename, i.e. the
    /// metadata is backed by either the store or a real fetch.
    pub fn is_sourced(&self) -> bool {
        !matches!(self.source, Source::Synthesized)
    }

    /// Normalizes a fetched record.
    ///
    /// - author: artist, else group, else the sentinel,
    /// - title: localized title, else the default title, else `fallback_title`,
    /// - series: parody, else series,
    /// - category: the reported type, else [`UNKNOWN_CATEGORY`].
    pub fn from_fetched(id: u64, raw: RawGallery, fallback_title: &str, sentinel: &Sentinel) -> Self {
        let author = raw
            .artist
            .as_ref()
            .and_then(|f| f.joined())
            .or_else(|| raw.group.as_ref().and_then(|f| f.joined()))
            .unwrap_or_else(|| sentinel.canonical().to_string());
        let title = raw
            .title_jpn
            .filter(|t| !t.is_empty())
            .or(raw.title.filter(|t| !t.is_empty()))
            .unwrap_or_else(|| fallback_title.to_string());
        let series = raw
            .parody
            .as_ref()
            .and_then(|f| f.joined())
            .or_else(|| raw.series.as_ref().and_then(|f| f.joined()));
        Self {
            id,
            title,
            author,
            category: raw.kind.filter(|k| !k.is_empty()).unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
            series,
            tags: raw.tags,
            language: raw.language.filter(|l| !l.is_empty()),
            source: Source::Fetched,
        }
    }

    /// Minimal record for when metadata is unavailable: the filename is the
    /// title and the filename-derived author (or the sentinel) the author.
    pub fn synthesized(
        id: u64,
        filename: &str,
        author: Option<String>,
        category: impl Into<String>,
        sentinel: &Sentinel,
    ) -> Self {
        Self {
            id,
            title: filename.to_string(),
            author: author.unwrap_or_else(|| sentinel.canonical().to_string()),
            category: category.into(),
            series: None,
            tags: Vec::new(),
            language: Some(UNKNOWN_LANGUAGE.to_string()),
            source: Source::Synthesized,
        }
    }
}
