use crate::Context;
use crate::error::{Error as LibraryError, ErrorKind as LibraryErrorKind};
use crate::organize::file::{Action, Record, organize_file_inner};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use shelver_cache::Repository;
use shelver_storage::Relocator;
use std::path::{Path, PathBuf};

/// Tallies for a finished (or cancelled) batch. Every submitted file is
/// counted in exactly one of `moved`, `already_in_place`, `skipped`, `failed`
/// or `not_started`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub moved: usize,
    pub already_in_place: usize,
    /// Destination occupied by a different file.
    pub skipped: usize,
    pub failed: usize,
    /// Files left alone because the batch was cancelled first.
    pub not_started: usize,
    /// Placed files whose store update failed. Also counted as moved or
    /// already in place.
    pub store_failures: usize,
}
impl BatchSummary {
    /// Add another batch's tallies to these.
    pub fn merge(&mut self, other: &BatchSummary) {
        self.total += other.total;
        self.moved += other.moved;
        self.already_in_place += other.already_in_place;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.not_started += other.not_started;
        self.store_failures += other.store_failures;
    }

    fn count(&mut self, action: &Action) {
        match action {
            Action::Moved(_) => self.moved += 1,
            Action::AlreadyInPlace(_) => self.already_in_place += 1,
            Action::Skipped { .. } => self.skipped += 1,
        }
        if action.organized().is_some_and(|o| matches!(o.record, Record::Failed(_))) {
            self.store_failures += 1;
        }
    }
}

/// Progress events emitted by [`organize`].
///
/// 1. [`Started`](Self::Started), once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete), once, with the number
///    of files submitted.
/// 3. [`Organized`](Self::Organized) or [`Failed`](Self::Failed) per file, in
///    completion order.
/// 4. [`Complete`](Self::Complete), or [`Cancelled`](Self::Cancelled) if
///    cancellation left files unstarted.
#[derive(Debug)]
pub enum OrganizeEvent {
    Started,
    DiscoveryComplete(u64),
    Organized(Action),
    Failed { path: PathBuf, error: LibraryError },
    Cancelled(BatchSummary),
    Complete(BatchSummary),
}

/// Organize every file in `files` into `base_dir/category/<author>/`.
///
/// Up to [`Context::workers`] files are handled at a time, the rest are
/// started in order as earlier ones finish. A file that fails is reported
/// and the batch carries on; only cancellation through [`Context::cancel`]
/// stops it early, and files already being moved are allowed to finish.
pub fn organize<'a>(
    relocator: &'a Relocator,
    cache: &'a Repository,
    ctx: &'a Context,
    files: Vec<PathBuf>,
    category: &'a str,
    base_dir: &'a Path,
) -> impl Stream<Item = OrganizeEvent> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield OrganizeEvent::Started;

        let mut summary = BatchSummary { total: files.len(), ..Default::default() };
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield OrganizeEvent::DiscoveryComplete(u64::try_from(files.len()).unwrap_or(0));

        let mut futures: Vec<_> = files
            .into_iter()
            .map(|path| async move {
                let result = organize_file_inner(relocator, cache, ctx, &path, category, base_dir)
                    .await
                    .or_raise(|| LibraryErrorKind::Organize);
                (path, result)
            })
            .collect();
        let mut processing = FuturesUnordered::new();
        if !ctx.cancel.is_cancelled() {
            processing.extend(futures.drain(..ctx.workers.max(1).min(futures.len())));
        }
        while let Some((path, result)) = processing.next().await {
            match result {
                Ok(action) => {
                    summary.count(&action);
                    yield OrganizeEvent::Organized(action);
                },
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = ?error, "Could not organize file");
                    summary.failed += 1;
                    yield OrganizeEvent::Failed { path, error };
                },
            }
            // Pop-n-push, but FIFO instead of LIFO.
            if !futures.is_empty() && !ctx.cancel.is_cancelled() {
                processing.push(futures.remove(0));
            }
        }

        if futures.is_empty() {
            tracing::info!(
                moved = summary.moved,
                already_in_place = summary.already_in_place,
                skipped = summary.skipped,
                failed = summary.failed,
                "Organize complete"
            );
            yield OrganizeEvent::Complete(summary);
        } else {
            summary.not_started = futures.len();
            tracing::warn!(not_started = summary.not_started, "Organize cancelled");
            yield OrganizeEvent::Cancelled(summary);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MetadataFetcher;
    use async_trait::async_trait;
    use rstest::rstest;
    use shelver_cache::Database;
    use shelver_extract::FetchPayload;
    use shelver_storage::{LocalFilesystem, TrashPolicy};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn inbox(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join("inbox").join(name);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(&path, name.as_bytes()).unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batch_counts_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Repository::from(&Database::connect_in_memory().await.unwrap());
        let relocator = Relocator::new(Arc::new(LocalFilesystem), TrashPolicy::default());
        let library = dir.path().join("library");
        let occupied = library.join("Manga/Acme/[Acme] Taken (3).cbz");
        std::fs::create_dir_all(occupied.parent().unwrap()).unwrap();
        std::fs::write(&occupied, b"other").unwrap();
        let mut files = inbox(
            dir.path(),
            &["[Acme] One (1).cbz", "[Beta] Two (2).cbz", "[Acme] Taken (3).cbz", "[Acme] No Id.cbz"],
        );
        files.push(dir.path().join("inbox/[Acme] Missing (4).cbz"));

        let ctx = Context::default().with_workers(2);
        let events: Vec<OrganizeEvent> =
            organize(&relocator, &cache, &ctx, files, "Manga", &library).collect().await;
        assert!(matches!(events.first(), Some(OrganizeEvent::Started)));
        assert!(matches!(events.get(1), Some(OrganizeEvent::DiscoveryComplete(5))));
        let Some(OrganizeEvent::Complete(summary)) = events.last() else {
            panic!("expected completion, got {:?}", events.last());
        };
        assert_eq!(
            *summary,
            BatchSummary { total: 5, moved: 2, skipped: 1, failed: 2, ..Default::default() }
        );
        assert_eq!(events.len(), 2 + 5 + 1);
        assert!(library.join("Manga/Beta/[Beta] Two (2).cbz").is_file());
        assert_eq!(std::fs::read(&occupied).unwrap(), b"other");
    }

    #[tokio::test]
    async fn test_cancelled_batch_starts_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Repository::from(&Database::connect_in_memory().await.unwrap());
        let relocator = Relocator::new(Arc::new(LocalFilesystem), TrashPolicy::default());
        let files = inbox(dir.path(), &["[A] One (1).cbz", "[A] Two (2).cbz", "[A] Three (3).cbz"]);
        let cancel = CancellationToken::new();
        let ctx = Context::default().with_workers(1).with_cancel(cancel.clone());
        let library = dir.path().join("library");

        let mut events = Box::pin(organize(&relocator, &cache, &ctx, files.clone(), "Manga", &library));
        let mut seen = Vec::new();
        while let Some(event) = events.next().await {
            if matches!(event, OrganizeEvent::Organized(_)) {
                // Stop after the first file.
                cancel.cancel();
            }
            seen.push(event);
        }
        let Some(OrganizeEvent::Cancelled(summary)) = seen.last() else {
            panic!("expected cancellation, got {:?}", seen.last());
        };
        assert_eq!((summary.moved, summary.not_started), (1, 2));
        assert!(!files[0].exists());
        assert!(files[1].exists());
        assert!(files[2].exists());
    }

    /// Counts how many fetches overlap.
    #[derive(Default)]
    struct OverlapFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl MetadataFetcher for OverlapFetcher {
        async fn fetch(&self, _id: u64) -> FetchPayload {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            FetchPayload::Error("busy".to_string())
        }
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[tokio::test]
    async fn test_at_most_workers_files_at_once(#[case] workers: usize) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Repository::from(&Database::connect_in_memory().await.unwrap());
        let relocator = Relocator::new(Arc::new(LocalFilesystem), TrashPolicy::default());
        let names: Vec<String> = (1..=7).map(|n| format!("[A] File ({n}).cbz")).collect();
        let files = inbox(dir.path(), &names.iter().map(String::as_str).collect::<Vec<_>>());
        let fetcher = Arc::new(OverlapFetcher::default());
        let ctx = Context::default().with_workers(workers).with_fetcher(fetcher.clone());

        let events: Vec<OrganizeEvent> =
            organize(&relocator, &cache, &ctx, files, "Manga", &dir.path().join("library")).collect().await;
        assert!(matches!(events.last(), Some(OrganizeEvent::Complete(BatchSummary { moved: 7, .. }))));
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), workers);
    }
}
