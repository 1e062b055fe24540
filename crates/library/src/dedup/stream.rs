use crate::Context;
use crate::candidates::CandidateSet;
use crate::dedup::plan;
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use shelver_storage::error::Error as StorageError;
use shelver_storage::{Disposal, Relocator};
use std::path::PathBuf;

/// A losing copy that was moved to the trash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discarded {
    pub id: u64,
    /// The copy that was kept.
    pub kept: PathBuf,
    /// Where the discarded copy was before.
    pub path: PathBuf,
    pub disposal: Disposal,
}

/// Tallies for a finished (or cancelled) run.
///
/// Every duplicate is counted exactly once in `moved`, `failed` or
/// `not_started`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupSummary {
    /// Galleries seen, with or without duplicates.
    pub groups: usize,
    pub duplicates: usize,
    pub moved: usize,
    pub failed: usize,
    /// Duplicates left alone because the run was cancelled first.
    pub not_started: usize,
    /// Candidates without a gallery id.
    pub unidentified: usize,
}

/// Progress events emitted by [`dedup`].
///
/// 1. [`Started`](Self::Started), once.
/// 2. [`Planned`](Self::Planned), once, after grouping.
/// 3. [`Discarded`](Self::Discarded) or [`Failed`](Self::Failed) per
///    duplicate, in completion order.
/// 4. [`Complete`](Self::Complete), or [`Cancelled`](Self::Cancelled) if the
///    run was stopped before every duplicate was started.
#[derive(Debug)]
pub enum DedupEvent {
    Started,
    Planned { groups: usize, duplicates: usize },
    Discarded(Discarded),
    /// The duplicate could not be moved and was left where it was.
    Failed { id: u64, path: PathBuf, error: StorageError },
    Cancelled(DedupSummary),
    Complete(DedupSummary),
}

/// Resolve duplicates among `candidates`, keeping the best copy of each
/// gallery and trashing the rest through `relocator`.
///
/// Paths naming the same file are counted once, and files already in the
/// relocator's shared trash directory are ignored.
///
/// Up to [`Context::workers`] files are moved at a time. A failed move is
/// reported and the run carries on. Cancellation through [`Context::cancel`]
/// stops new moves from starting; moves already running finish.
pub fn dedup<'a>(
    relocator: &'a Relocator,
    ctx: &'a Context,
    candidates: Vec<PathBuf>,
) -> impl Stream<Item = DedupEvent> + 'a {
    stream!({
        yield DedupEvent::Started;

        // A copy must never be grouped with itself under another spelling.
        let mut distinct = CandidateSet::new(relocator.filesystem(), relocator.trash_dir()).await;
        for path in candidates {
            distinct.insert(path).await;
        }
        let plan = plan(distinct.into_vec(), &ctx.extension);
        let mut summary = DedupSummary {
            groups: plan.groups.len(),
            duplicates: plan.duplicates(),
            unidentified: plan.unidentified.len(),
            ..Default::default()
        };
        yield DedupEvent::Planned { groups: summary.groups, duplicates: summary.duplicates };

        let mut futures: Vec<_> = plan
            .groups
            .into_iter()
            .flat_map(|group| {
                let kept = group.winner.path;
                group.losers.into_iter().map(move |loser| (group.id, kept.clone(), loser.path))
            })
            .map(|(id, kept, path)| async move {
                let result = relocator.move_to_trash(&path).await;
                (id, kept, path, result)
            })
            .collect();
        let mut processing = FuturesUnordered::new();
        if !ctx.cancel.is_cancelled() {
            processing.extend(futures.drain(..ctx.workers.max(1).min(futures.len())));
        }
        while let Some((id, kept, path, result)) = processing.next().await {
            match result {
                Ok(disposal) => {
                    summary.moved += 1;
                    yield DedupEvent::Discarded(Discarded { id, kept, path, disposal });
                },
                Err(error) => {
                    tracing::warn!(id, path = %path.display(), error = ?error, "Could not trash duplicate");
                    summary.failed += 1;
                    yield DedupEvent::Failed { id, path, error };
                },
            }
            // FIFO promotion, unless asked to stop.
            if !futures.is_empty() && !ctx.cancel.is_cancelled() {
                processing.push(futures.remove(0));
            }
        }

        if futures.is_empty() {
            tracing::info!(moved = summary.moved, failed = summary.failed, groups = summary.groups, "Dedup complete");
            yield DedupEvent::Complete(summary);
        } else {
            summary.not_started = futures.len();
            tracing::warn!(not_started = summary.not_started, "Dedup cancelled");
            yield DedupEvent::Cancelled(summary);
        }
    })
}
