//! Everything a command needs, built once from configuration.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelver_cache::{Database, Repository};
use shelver_config::Config;
use shelver_extract::Sentinel;
use shelver_library::Context;
use shelver_library::fetch::{CommandFetcher, FetcherHandle, OfflineFetcher};
use shelver_storage::{FsHandle, LocalFilesystem, ReadOnlyFilesystem, Relocator, TrashPolicy};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct App {
    pub config: Config,
    pub db: Database,
    pub cache: Repository,
    pub relocator: Relocator,
    pub ctx: Context,
}
impl App {
    pub async fn new(config: Config, dry_run: bool, cancel: CancellationToken) -> Result<Self> {
        let db = Database::connect(&config.database).await.or_raise(|| ErrorKind::Database)?;
        let cache = Repository::new(db.pool().clone(), dry_run);
        let fs: FsHandle = if dry_run {
            tracing::info!("Dry run: no files will be moved and the store will not be written");
            Arc::new(ReadOnlyFilesystem::new(Arc::new(LocalFilesystem)))
        } else {
            Arc::new(LocalFilesystem)
        };
        let relocator = Relocator::new(
            fs,
            TrashPolicy {
                dir: config.trash_dir.clone(),
                purge: config.purge,
            },
        );
        let sentinel = Sentinel::new(config.no_author.iter().cloned()).or_raise(|| ErrorKind::Config)?;
        let ctx = Context::default()
            .with_extension(config.extension.as_str())
            .with_sentinel(sentinel)
            .with_workers(config.workers)
            .with_strict(config.strict)
            .with_fetcher(Self::fetcher(&config))
            .with_cancel(cancel);
        Ok(Self { config, db, cache, relocator, ctx })
    }

    /// The configured downloader, or the offline fetcher if it is disabled or
    /// can't be found.
    fn fetcher(config: &Config) -> FetcherHandle {
        if !config.fetch.enabled {
            return Arc::new(OfflineFetcher);
        }
        match CommandFetcher::new(&config.fetch.command, config.fetch.url.as_str()) {
            Ok(fetcher) => Arc::new(fetcher),
            Err(e) => {
                tracing::warn!(error = ?e, "Metadata fetcher unavailable, using filenames only");
                Arc::new(OfflineFetcher)
            },
        }
    }

    pub fn fs(&self) -> &FsHandle {
        self.relocator.filesystem()
    }
}
