//! Repository over all four store tables.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{AuthorAlias, AuthorSetting, AuthorSettingRow, Category, GalleryRecord, GalleryRow};
use exn::ResultExt;
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::UtcDateTime;
use tracing::instrument;

/// Reads and writes gallery metadata, author settings, aliases and categories.
///
/// With `dry_run` set every write is logged and skipped, reads still hit the
/// database.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn gallery_id(id: u64) -> Result<i64> {
        i64::try_from(id).or_raise(|| ErrorKind::InvalidData("gallery id"))
    }

    fn non_empty(value: &str, what: &'static str) -> Result<String> {
        let value = value.trim();
        if value.is_empty() {
            exn::bail!(ErrorKind::InvalidData(what));
        }
        Ok(value.to_string())
    }

    // =========================================================================
    // Galleries
    // =========================================================================

    #[instrument(level = "debug", skip(self))]
    pub async fn get_gallery(&self, id: u64) -> Result<Option<GalleryRecord>> {
        let row: Option<GalleryRow> = sqlx::query_as(include_str!("../queries/get_gallery.sql"))
            .bind(Self::gallery_id(id)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(GalleryRecord::try_from).transpose()
    }

    /// Insert or replace the gallery with the same id. `imported_at` is
    /// refreshed on every call.
    #[instrument(level = "debug", skip_all, fields(id = record.id))]
    pub async fn upsert_gallery(&self, record: &GalleryRecord) -> Result<()> {
        let row = GalleryRow::try_from(record)?;
        if self.dry_run {
            tracing::info!(id = record.id, "Dry run: skipping gallery upsert");
            return Ok(());
        }
        Self::bind_gallery(sqlx::query(include_str!("../queries/upsert_gallery.sql")), row)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    fn bind_gallery<'q>(
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        row: GalleryRow,
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        query
            .bind(row.id)
            .bind(row.title)
            .bind(row.original_filename)
            .bind(row.current_path)
            .bind(row.author)
            .bind(row.category)
            .bind(row.series)
            .bind(row.tags)
            .bind(row.language)
            .bind(row.imported_at)
    }

    /// Persist the outcome of a successful organize: the gallery row and the
    /// author's category preference, in one transaction.
    ///
    /// Rows whose contents already match are left alone (timestamps included),
    /// so recording the same placement twice changes nothing. Returns `true`
    /// if anything was written.
    #[instrument(level = "debug", skip_all, fields(id = record.id, author = %record.author, category = %record.category))]
    pub async fn record_organized(&self, record: &GalleryRecord) -> Result<bool> {
        let row = GalleryRow::try_from(record)?;
        let author = Self::non_empty(&record.author, "author name")?;
        if self.dry_run {
            tracing::info!(id = record.id, "Dry run: skipping organize bookkeeping");
            return Ok(false);
        }
        let now = row.imported_at;
        let mut tx: Transaction<'_, Sqlite> = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let galleries = Self::bind_gallery(sqlx::query(include_str!("../queries/record_gallery.sql")), row)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        let settings = sqlx::query(include_str!("../queries/record_author_setting.sql"))
            .bind(author)
            .bind(&record.category)
            .bind(now)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(galleries + settings > 0)
    }

    // =========================================================================
    // Author settings
    // =========================================================================

    pub async fn get_author_setting(&self, author: &str) -> Result<Option<AuthorSetting>> {
        let row: Option<AuthorSettingRow> = sqlx::query_as(include_str!("../queries/get_author_setting.sql"))
            .bind(author)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(AuthorSetting::try_from).transpose()
    }

    /// The category the (already canonical) author was last filed under.
    pub async fn get_author_category(&self, author: &str) -> Result<Option<String>> {
        Ok(self.get_author_setting(author).await?.map(|setting| setting.default_category))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn set_author_category(&self, author: &str, category: &str) -> Result<()> {
        let author = Self::non_empty(author, "author name")?;
        let category = Self::non_empty(category, "category name")?;
        if self.dry_run {
            tracing::info!(%author, %category, "Dry run: skipping author setting");
            return Ok(());
        }
        sqlx::query(include_str!("../queries/upsert_author_setting.sql"))
            .bind(author)
            .bind(category)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    // =========================================================================
    // Aliases
    // =========================================================================

    /// Exactly one alias lookup: returns the mapped primary author, or the
    /// input unchanged. Chains are not followed.
    #[instrument(level = "trace", skip(self))]
    pub async fn resolve_primary(&self, author: &str) -> Result<String> {
        let primary: Option<String> = sqlx::query_scalar(include_str!("../queries/get_primary_author.sql"))
            .bind(author)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(primary.unwrap_or_else(|| author.to_string()))
    }

    /// Register (or re-point) an alias.
    #[instrument(level = "debug", skip(self))]
    pub async fn add_alias(&self, alias: &str, primary: &str) -> Result<()> {
        let alias = Self::non_empty(alias, "alias name")?;
        let primary = Self::non_empty(primary, "author name")?;
        if self.dry_run {
            tracing::info!(%alias, %primary, "Dry run: skipping alias registration");
            return Ok(());
        }
        sqlx::query(include_str!("../queries/upsert_alias.sql"))
            .bind(alias)
            .bind(primary)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub async fn list_aliases(&self) -> Result<Vec<AuthorAlias>> {
        sqlx::query_as(include_str!("../queries/list_aliases.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories, by display order then name.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        sqlx::query_as(include_str!("../queries/list_categories.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Add a category with the default display order. Existing names are
    /// left untouched. Returns `true` if a row was inserted.
    #[instrument(level = "debug", skip(self))]
    pub async fn add_category(&self, name: &str) -> Result<bool> {
        let name = Self::non_empty(name, "category name")?;
        if self.dry_run {
            tracing::info!(%name, "Dry run: skipping category insert");
            return Ok(false);
        }
        let result = sqlx::query(include_str!("../queries/insert_category.sql"))
            .bind(name)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;

    async fn repo() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    fn gallery(id: u64, author: &str, category: &str) -> GalleryRecord {
        GalleryRecord {
            id,
            title: format!("Title {id}"),
            original_filename: format!("[{author}] Title ({id}).cbz"),
            current_path: PathBuf::from(format!("/library/{category}/{author}/[{author}] Title ({id}).cbz")),
            author: author.to_string(),
            category: category.to_string(),
            series: None,
            tags: vec!["full color".to_string()],
            language: Some("japanese".to_string()),
            imported_at: UtcDateTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn test_gallery_upsert_and_get() {
        let repo = repo().await;
        assert!(repo.get_gallery(555).await.unwrap().is_none());
        repo.upsert_gallery(&gallery(555, "Acme", "Manga")).await.unwrap();
        let stored = repo.get_gallery(555).await.unwrap().unwrap();
        assert_eq!(stored.author, "Acme");
        assert_eq!(stored.tags, ["full color"]);
        assert!(stored.imported_at > UtcDateTime::UNIX_EPOCH);
        // Upserting again replaces, never duplicates.
        repo.upsert_gallery(&gallery(555, "Acme", "Doujinshi")).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM galleries").fetch_one(&repo.pool).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(repo.get_gallery(555).await.unwrap().unwrap().category, "Doujinshi");
    }

    #[tokio::test]
    async fn test_record_organized_writes_both_tables() {
        let repo = repo().await;
        assert!(repo.record_organized(&gallery(555, "Acme", "Manga")).await.unwrap());
        assert_eq!(repo.get_gallery(555).await.unwrap().unwrap().category, "Manga");
        assert_eq!(repo.get_author_category("Acme").await.unwrap().as_deref(), Some("Manga"));
    }

    #[tokio::test]
    async fn test_record_organized_unchanged_is_noop() {
        let repo = repo().await;
        let record = gallery(555, "Acme", "Manga");
        assert!(repo.record_organized(&record).await.unwrap());
        let first = repo.get_gallery(555).await.unwrap().unwrap();
        let setting = repo.get_author_setting("Acme").await.unwrap().unwrap();
        // Rewind the stored timestamps so a second write would be detectable.
        sqlx::query("UPDATE galleries SET imported_at = 1").execute(&repo.pool).await.unwrap();
        sqlx::query("UPDATE author_settings SET updated_at = 1").execute(&repo.pool).await.unwrap();
        assert!(!repo.record_organized(&record).await.unwrap());
        let second = repo.get_gallery(555).await.unwrap().unwrap();
        assert_eq!(second.imported_at.unix_timestamp(), 1);
        assert_eq!(second.current_path, first.current_path);
        let unchanged = repo.get_author_setting("Acme").await.unwrap().unwrap();
        assert_eq!(unchanged.default_category, setting.default_category);
        assert_eq!(unchanged.updated_at.unix_timestamp(), 1);
    }

    #[tokio::test]
    async fn test_author_category_last_write_wins() {
        let repo = repo().await;
        assert!(repo.get_author_category("Acme").await.unwrap().is_none());
        repo.set_author_category("Acme", "Manga").await.unwrap();
        repo.set_author_category("Acme", "Doujinshi").await.unwrap();
        assert_eq!(repo.get_author_category("Acme").await.unwrap().as_deref(), Some("Doujinshi"));
    }

    #[tokio::test]
    async fn test_alias_resolution_is_one_hop() {
        let repo = repo().await;
        assert_eq!(repo.resolve_primary("A").await.unwrap(), "A");
        repo.add_alias("A", "B").await.unwrap();
        repo.add_alias("B", "C").await.unwrap();
        assert_eq!(repo.resolve_primary("A").await.unwrap(), "B");
        assert_eq!(repo.resolve_primary("B").await.unwrap(), "C");
        // Re-registering an alias re-points it.
        repo.add_alias("A", "D").await.unwrap();
        assert_eq!(repo.resolve_primary("A").await.unwrap(), "D");
        let aliases = repo.list_aliases().await.unwrap();
        assert_eq!(
            aliases,
            [
                AuthorAlias { alias: "A".to_string(), primary: "D".to_string() },
                AuthorAlias { alias: "B".to_string(), primary: "C".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_alias_lookup_is_exact() {
        let repo = repo().await;
        repo.add_alias("Old Name", "New Name").await.unwrap();
        assert_eq!(repo.resolve_primary("old name").await.unwrap(), "old name");
    }

    #[tokio::test]
    async fn test_categories_ordering() {
        let repo = repo().await;
        assert!(repo.add_category("Western").await.unwrap());
        assert!(repo.add_category("Artbook").await.unwrap());
        // Insert-or-ignore: the seeded order survives.
        assert!(!repo.add_category("Manga").await.unwrap());
        let names: Vec<String> = repo.list_categories().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Artbook", "Western", "Doujinshi", "Manga", "Game CG", "Artist CG", "Anime", "Unknown"]);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[tokio::test]
    async fn test_empty_names_rejected(#[case] name: &str) {
        let repo = repo().await;
        assert!(repo.add_category(name).await.is_err());
        assert!(repo.add_alias(name, "Primary").await.is_err());
        assert!(repo.set_author_category(name, "Manga").await.is_err());
        assert_eq!(repo.list_categories().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_dry_run_skips_writes() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::new(db.pool().clone(), true);
        assert!(!repo.record_organized(&gallery(1, "Acme", "Manga")).await.unwrap());
        repo.upsert_gallery(&gallery(2, "Acme", "Manga")).await.unwrap();
        repo.add_alias("A", "B").await.unwrap();
        assert!(!repo.add_category("Western").await.unwrap());
        assert!(repo.get_gallery(1).await.unwrap().is_none());
        assert!(repo.get_gallery(2).await.unwrap().is_none());
        assert!(repo.get_author_category("Acme").await.unwrap().is_none());
        assert_eq!(repo.resolve_primary("A").await.unwrap(), "A");
        assert_eq!(repo.list_categories().await.unwrap().len(), 6);
    }
}
