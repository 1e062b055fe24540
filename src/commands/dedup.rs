use crate::app::App;
use crate::cli::DedupArgs;
use crate::commands::{describe, exit_code};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::StreamExt;
use shelver_library::candidates::{EverythingSearch, expand, search};
use shelver_library::dedup::{DedupEvent, DedupSummary, dedup};
use std::pin::pin;
use std::process::ExitCode;

pub async fn run(app: &App, args: DedupArgs) -> Result<ExitCode> {
    let extension = &app.ctx.extension;
    let trash = app.relocator.trash_dir();
    let candidates = match &args.search {
        Some(keyword) => {
            let index = EverythingSearch::new(&app.config.search.command).or_raise(|| ErrorKind::Command)?;
            search(&index, app.fs(), keyword, extension, trash).await.or_raise(|| ErrorKind::Command)?
        },
        None => expand(app.fs(), &args.paths, extension, trash).await.or_raise(|| ErrorKind::Command)?,
    };
    if candidates.is_empty() {
        println!("No .{extension} files found.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut summary = DedupSummary::default();
    let mut events = pin!(dedup(&app.relocator, &app.ctx, candidates));
    while let Some(event) = events.next().await {
        match event {
            DedupEvent::Started => {},
            DedupEvent::Planned { groups, duplicates } => {
                println!("{groups} galleries, {duplicates} duplicates");
            },
            DedupEvent::Discarded(d) => {
                println!("[{}] kept {}", d.id, d.kept.display());
                println!("[{}]   {} {}", d.id, d.path.display(), describe(&d.disposal));
            },
            DedupEvent::Failed { id, path, error } => {
                println!("[{id}]   FAILED {}: {}", path.display(), *error);
            },
            DedupEvent::Cancelled(s) => {
                println!("Cancelled, {} duplicates not processed.", s.not_started);
                summary = s;
            },
            DedupEvent::Complete(s) => summary = s,
        }
    }
    println!(
        "Done: {} galleries, {} duplicates moved, {} failed, {} without an id.",
        summary.groups, summary.moved, summary.failed, summary.unidentified
    );
    Ok(exit_code(summary.failed, summary.not_started))
}
