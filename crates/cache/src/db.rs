//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Organize batches run a handful of workers; each needs at most one
// connection at a time.
const MAX_CONNECTIONS: u32 = 4;

/// Connection pool for the store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // PRAGMAs that aren't connection options must be applied to
            // every pooled connection, not only the first.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open the store at the given path.
    ///
    /// Creates the database file (and its parent directory) if missing, then
    /// brings the schema up to date.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
        }
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Connect to an in-memory database.
    ///
    /// Not gated behind `#[cfg(test)]` so that dependent crates can use it in
    /// their own tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Every connection to ":memory:" is a separate database.
        Self::new(options, Some(1)).await
    }

    /// Connection options shared by file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // WAL lets lookups read while an organize worker is writing.
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // Enforce any foreign key a later migration declares.
            .foreign_keys(true)
            // PRAGMA synchronous = NORMAL: safe under WAL, only the last
            // commits can be lost on power failure, never corrupted.
            .synchronous(SqliteSynchronous::Normal)
            // PRAGMA busy_timeout = 3000ms
            // Concurrent organize workers each write one small transaction;
            // waiting is far cheaper than failing the file.
            .busy_timeout(std::time::Duration::from_millis(3000))
    }

    /// PRAGMAs that SqliteConnectOptions doesn't expose.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                -- Small, frequent writes: checkpoint before the WAL grows large.
                PRAGMA wal_autocheckpoint = 500;
                -- Temporary tables and indices (sorting, grouping) stay off disk.
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        // Refresh query planner statistics; failure only costs speed next time.
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(!db.pool().is_closed());
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_default_categories_seeded() {
        let db = Database::connect_in_memory().await.unwrap();
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM categories ORDER BY display_order")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(names, ["Doujinshi", "Manga", "Game CG", "Artist CG", "Anime", "Unknown"]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_connect_creates_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("library.db");
        let db = Database::connect(&path).await.unwrap();
        assert!(path.exists());
        let row: (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0.to_lowercase(), "wal");
        db.close().await;
        // Reopening an existing store keeps its data and doesn't reseed.
        let db = Database::connect(&path).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM categories").fetch_one(db.pool()).await.unwrap();
        assert_eq!(count, 6);
        db.close().await;
    }

    #[tokio::test]
    async fn test_pragmas_apply_to_every_connection() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path().join("library.db")).await.unwrap();
        let mut first = db.pool().acquire().await.unwrap();
        let mut second = db.pool().acquire().await.unwrap();
        for conn in [&mut *first, &mut *second] {
            let checkpoint: i64 = sqlx::query_scalar("PRAGMA wal_autocheckpoint").fetch_one(&mut *conn).await.unwrap();
            let temp_store: i64 = sqlx::query_scalar("PRAGMA temp_store").fetch_one(&mut *conn).await.unwrap();
            let timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout").fetch_one(&mut *conn).await.unwrap();
            let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys").fetch_one(&mut *conn).await.unwrap();
            // temp_store: 2 is MEMORY.
            assert_eq!((checkpoint, temp_store, timeout, foreign_keys), (500, 2, 3000, 1));
        }
        drop((first, second));
        db.close().await;
    }
}
