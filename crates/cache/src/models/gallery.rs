use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use shelver_extract::{MetadataRecord, Source};
use std::path::PathBuf;
use time::UtcDateTime;

/// One logical gallery as last organized.
///
/// `current_path` reflects where the organizer put the file; it goes stale if
/// the file is moved by anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryRecord {
    pub id: u64,
    pub title: String,
    pub original_filename: String,
    pub current_path: PathBuf,
    pub author: String,
    pub category: String,
    pub series: Option<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    /// Set by the store on every write; ignored on the way in.
    pub imported_at: UtcDateTime,
}
impl GalleryRecord {
    /// Metadata view of a stored gallery, tagged as store-sourced.
    pub fn to_metadata(&self) -> MetadataRecord {
        MetadataRecord {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            category: self.category.clone(),
            series: self.series.clone(),
            tags: self.tags.clone(),
            language: self.language.clone(),
            source: Source::Store,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GalleryRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) original_filename: String,
    pub(crate) current_path: String,
    pub(crate) author: String,
    pub(crate) category: String,
    pub(crate) series: Option<String>,
    pub(crate) tags: String,
    pub(crate) language: Option<String>,
    pub(crate) imported_at: i64,
}
impl TryFrom<&GalleryRecord> for GalleryRow {
    type Error = Error;
    fn try_from(record: &GalleryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: i64::try_from(record.id).or_raise(|| ErrorKind::InvalidData("gallery id"))?,
            title: record.title.clone(),
            original_filename: record.original_filename.clone(),
            current_path: record
                .current_path
                .to_str()
                .ok_or_raise(|| ErrorKind::InvalidData("path"))?
                .to_string(),
            author: record.author.clone(),
            category: record.category.clone(),
            series: record.series.clone(),
            tags: serde_json::to_string(&record.tags).or_raise(|| ErrorKind::InvalidData("tags"))?,
            language: record.language.clone(),
            imported_at: UtcDateTime::now().unix_timestamp(),
        })
    }
}
impl TryFrom<GalleryRow> for GalleryRecord {
    type Error = Error;
    fn try_from(row: GalleryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: u64::try_from(row.id).or_raise(|| ErrorKind::InvalidData("gallery id"))?,
            title: row.title,
            original_filename: row.original_filename,
            current_path: PathBuf::from(row.current_path),
            author: row.author,
            category: row.category,
            series: row.series,
            tags: serde_json::from_str(&row.tags).or_raise(|| ErrorKind::InvalidData("tags"))?,
            language: row.language,
            imported_at: UtcDateTime::from_unix_timestamp(row.imported_at)
                .or_raise(|| ErrorKind::InvalidData("import date"))?,
        })
    }
}
