mod app;
mod cli;
mod commands;
mod error;

use crate::app::App;
use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use shelver_config::Config;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn,shelver=info,shelver_library=info,shelver_storage=info",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref(), cli.overrides.figment()).or_raise(|| ErrorKind::Config)?;
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing files in progress");
                cancel.cancel();
            }
        }
    });

    let app = App::new(config, cli.dry_run, cancel).await?;
    let result = match cli.command {
        Command::Dedup(args) => commands::dedup::run(&app, args).await,
        Command::Organize(args) => commands::organize::run(&app, args).await,
        Command::Predict { paths } => commands::lookup::predict(&app, &paths).await,
        Command::Alias(command) => commands::lookup::alias(&app, command).await,
        Command::Category(command) => commands::lookup::category(&app, command).await,
        Command::Author(command) => commands::lookup::author(&app, command).await,
        Command::Gallery(command) => commands::lookup::gallery(&app, command).await,
    };
    app.db.close().await;
    result
}
