use crate::app::App;
use crate::cli::OrganizeArgs;
use crate::commands::exit_code;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use shelver_library::candidates::expand;
use shelver_library::categories::CategoryCache;
use shelver_library::organize::{Action, BatchSummary, OrganizeEvent, Record, organize};
use shelver_library::predict::predict;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

pub async fn run(app: &App, args: OrganizeArgs) -> Result<ExitCode> {
    let base_dir = args
        .library
        .as_deref()
        .or(app.config.library.as_deref())
        .ok_or_raise(|| ErrorKind::Usage("no library directory: pass --library or set `library`".to_string()))?;
    let files = expand(app.fs(), &args.paths, &app.ctx.extension, app.relocator.trash_dir())
        .await
        .or_raise(|| ErrorKind::Command)?;
    let categories = CategoryCache::new(app.cache.clone());

    let mut batches: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut unpredicted = 0;
    match args.category {
        Some(category) => {
            if !categories.contains(&category).await.or_raise(|| ErrorKind::Command)? {
                let known = categories.names().await.or_raise(|| ErrorKind::Command)?.join(", ");
                exn::bail!(ErrorKind::Usage(format!(
                    "unknown category {category:?} (known: {known}); add it with `shelver category add`"
                )));
            }
            batches.insert(category, files);
        },
        None => {
            for file in files {
                let prediction = predict(&app.cache, &app.ctx, &file).await.or_raise(|| ErrorKind::Command)?;
                match prediction.category {
                    Some(category) => batches.entry(category).or_default().push(file),
                    None => {
                        println!("? {}: no category known, pass --category", file.display());
                        unpredicted += 1;
                    },
                }
            }
        },
    }

    let total = organize_batches(batches, &app.ctx.cancel, |category, files| async move {
        organize_batch(app, files, &category, base_dir).await
    })
    .await;
    println!(
        "Done: {} moved, {} already in place, {} skipped, {} failed, {} not started, {} without a category.",
        total.moved, total.already_in_place, total.skipped, total.failed, total.not_started, unpredicted
    );
    if total.store_failures > 0 {
        println!("{} files were moved but not recorded in the store.", total.store_failures);
    }
    Ok(exit_code(total.failed + total.store_failures, total.not_started))
}

/// Organize each category's files in turn. Once cancelled, no further batch
/// is started and its files are counted as not started.
async fn organize_batches<F, Fut>(
    batches: BTreeMap<String, Vec<PathBuf>>,
    cancel: &CancellationToken,
    mut run: F,
) -> BatchSummary
where
    F: FnMut(String, Vec<PathBuf>) -> Fut,
    Fut: Future<Output = BatchSummary>,
{
    let mut total = BatchSummary::default();
    for (category, files) in batches {
        if cancel.is_cancelled() {
            tracing::debug!(%category, files = files.len(), "Batch not started");
            total.total += files.len();
            total.not_started += files.len();
            continue;
        }
        total.merge(&run(category, files).await);
    }
    total
}

async fn organize_batch(app: &App, files: Vec<PathBuf>, category: &str, base_dir: &Path) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let mut events = pin!(organize(&app.relocator, &app.cache, &app.ctx, files, category, base_dir));
    while let Some(event) = events.next().await {
        match event {
            OrganizeEvent::Started => {},
            OrganizeEvent::DiscoveryComplete(n) => println!("{category}: {n} files"),
            OrganizeEvent::Organized(action) => print_action(&action),
            OrganizeEvent::Failed { path, error } => println!("! {}: {error:?}", path.display()),
            OrganizeEvent::Cancelled(s) | OrganizeEvent::Complete(s) => summary = s,
        }
    }
    summary
}

fn print_action(action: &Action) {
    match action {
        Action::Moved(o) => println!("> [{}] {} ({})", o.id, o.path.display(), o.source),
        Action::AlreadyInPlace(o) => println!("= [{}] {}", o.id, o.path.display()),
        Action::Skipped { path, occupied } => {
            println!("~ {}: {} is taken by another file", path.display(), occupied.display());
        },
    }
    if let Some(o) = action.organized()
        && let Record::Failed(e) = &o.record
    {
        println!("  store not updated: {}", **e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn batches() -> BTreeMap<String, Vec<PathBuf>> {
        BTreeMap::from([
            ("Doujinshi".to_string(), vec![PathBuf::from("a (1).cbz")]),
            ("Manga".to_string(), vec![PathBuf::from("b (2).cbz"), PathBuf::from("c (3).cbz")]),
        ])
    }

    #[tokio::test]
    async fn test_cancel_counts_later_batches_as_not_started() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);
        let total = organize_batches(batches(), &cancel, |_, files| {
            calls.fetch_add(1, Ordering::SeqCst);
            // Cancelled while the last file of the first batch was in flight.
            cancel.cancel();
            async move { BatchSummary { total: files.len(), moved: files.len(), ..Default::default() } }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(total, BatchSummary { total: 3, moved: 1, not_started: 2, ..Default::default() });
    }

    #[tokio::test]
    async fn test_every_batch_runs_without_cancel() {
        let total = organize_batches(batches(), &CancellationToken::new(), |_, files| async move {
            BatchSummary { total: files.len(), moved: files.len(), ..Default::default() }
        })
        .await;
        assert_eq!(total, BatchSummary { total: 3, moved: 3, ..Default::default() });
    }
}
