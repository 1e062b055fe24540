use clap::{ArgAction, Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::Serialized;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shelver", version, about)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, global = true, env = "SHELVER_CONFIG")]
    pub config: Option<PathBuf>,
    /// More output; repeat for more. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    /// Print what would happen without moving files or writing to the store.
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,
    #[command(flatten)]
    pub overrides: Overrides,
    #[command(subcommand)]
    pub command: Command,
}

/// Flags that override configured values. Only flags actually given are
/// merged.
#[derive(Debug, Default, Args, Serialize)]
pub struct Overrides {
    /// Store location.
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Extension of the archives to work on.
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Shared trash directory instead of `_trash` next to each file.
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trash_dir: Option<PathBuf>,
    /// Files processed at once.
    #[arg(short = 'j', long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Delete duplicates right after trashing them.
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub purge: bool,
    /// Refuse to organize files without fetched or stored metadata.
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub strict: bool,
    /// Never run the metadata fetcher.
    #[arg(long, global = true)]
    #[serde(skip)]
    pub offline: bool,
}
impl Overrides {
    pub fn figment(&self) -> Figment {
        let figment = Figment::from(Serialized::defaults(self));
        if self.offline { figment.merge(("fetch.enabled", false)) } else { figment }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keep the best copy of each gallery and move the rest to the trash.
    Dedup(DedupArgs),
    /// Move galleries into `library/category/author/`.
    Organize(OrganizeArgs),
    /// Show the category and author a file would be organized under.
    Predict {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Manage author aliases.
    #[command(subcommand)]
    Alias(AliasCommand),
    /// Manage the category list.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Inspect authors.
    #[command(subcommand)]
    Author(AuthorCommand),
    /// Inspect organized galleries.
    #[command(subcommand)]
    Gallery(GalleryCommand),
}

#[derive(Debug, Args)]
pub struct DedupArgs {
    /// Files and directories to look for duplicates in.
    #[arg(required_unless_present = "search", conflicts_with = "search")]
    pub paths: Vec<PathBuf>,
    /// Ask the search index for candidates instead of walking directories.
    #[arg(short, long, value_name = "KEYWORD")]
    pub search: Option<String>,
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Files and directories to organize.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Category to file everything under. Without it each file goes where
    /// `predict` says, and files without a prediction are left alone.
    #[arg(short = 'C', long)]
    pub category: Option<String>,
    /// Library base directory; defaults to the configured one.
    #[arg(short = 'L', long)]
    pub library: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum AliasCommand {
    /// Make ALIAS resolve to PRIMARY.
    Add { alias: String, primary: String },
    List,
    /// Show the canonical name for an author.
    Resolve { name: String },
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    List,
    Add { name: String },
}

#[derive(Debug, Subcommand)]
pub enum AuthorCommand {
    /// Show the category an author was last filed under.
    Show { name: String },
}

#[derive(Debug, Subcommand)]
pub enum GalleryCommand {
    Show { id: u64 },
}
