//! Single-shot queries and bookkeeping commands.

use crate::app::App;
use crate::cli::{AliasCommand, AuthorCommand, CategoryCommand, GalleryCommand};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelver_library::alias;
use shelver_library::categories::CategoryCache;
use shelver_library::predict::predict as predict_file;
use std::path::PathBuf;
use std::process::ExitCode;

pub async fn predict(app: &App, paths: &[PathBuf]) -> Result<ExitCode> {
    for path in paths {
        let prediction = predict_file(&app.cache, &app.ctx, path).await.or_raise(|| ErrorKind::Command)?;
        println!(
            "{}\n  category: {}\n  author:   {}{}",
            path.display(),
            prediction.category.as_deref().unwrap_or("-"),
            prediction.author.as_deref().unwrap_or("-"),
            if prediction.known { "\n  (organized before)" } else { "" },
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn alias(app: &App, command: AliasCommand) -> Result<ExitCode> {
    match command {
        AliasCommand::Add { alias: name, primary } => {
            alias::register(&app.cache, &name, &primary).await.or_raise(|| ErrorKind::Command)?;
            println!("{name} -> {primary}");
        },
        AliasCommand::List => {
            let aliases = alias::list(&app.cache).await.or_raise(|| ErrorKind::Command)?;
            if aliases.is_empty() {
                println!("No aliases registered.");
            }
            for entry in aliases {
                println!("{} -> {}", entry.alias, entry.primary);
            }
        },
        AliasCommand::Resolve { name } => {
            let primary = alias::canonical_author(&app.cache, &name).await.or_raise(|| ErrorKind::Command)?;
            println!("{primary}");
        },
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn category(app: &App, command: CategoryCommand) -> Result<ExitCode> {
    let categories = CategoryCache::new(app.cache.clone());
    match command {
        CategoryCommand::List => {
            for name in categories.names().await.or_raise(|| ErrorKind::Command)? {
                println!("{name}");
            }
        },
        CategoryCommand::Add { name } => {
            if categories.add(&name).await.or_raise(|| ErrorKind::Command)? {
                println!("Added {}", name.trim());
            } else if app.cache.is_dry_run() {
                println!("Dry run: {} not added", name.trim());
            } else {
                println!("{} already exists", name.trim());
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn author(app: &App, command: AuthorCommand) -> Result<ExitCode> {
    let AuthorCommand::Show { name } = command;
    let primary = alias::canonical_author(&app.cache, &name).await.or_raise(|| ErrorKind::Command)?;
    if primary != name.trim() {
        println!("{name} is an alias of {primary}");
    }
    match app.cache.get_author_setting(&primary).await.or_raise(|| ErrorKind::Command)? {
        Some(setting) => {
            let since = setting.updated_at.date();
            println!("{}: {} (since {since})", setting.author_name, setting.default_category);
        },
        None => println!("{primary}: no category recorded"),
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn gallery(app: &App, command: GalleryCommand) -> Result<ExitCode> {
    let GalleryCommand::Show { id } = command;
    let Some(gallery) = app.cache.get_gallery(id).await.or_raise(|| ErrorKind::Command)? else {
        println!("Gallery {id} has not been organized.");
        return Ok(ExitCode::FAILURE);
    };
    println!("[{}] {}", gallery.id, gallery.title);
    println!("  file:     {}", gallery.current_path.display());
    println!("  original: {}", gallery.original_filename);
    println!("  author:   {}", gallery.author);
    println!("  category: {}", gallery.category);
    if let Some(series) = &gallery.series {
        println!("  series:   {series}");
    }
    if let Some(language) = &gallery.language {
        println!("  language: {language}");
    }
    if !gallery.tags.is_empty() {
        println!("  tags:     {}", gallery.tags.join(", "));
    }
    println!("  imported: {}", gallery.imported_at.date());
    Ok(ExitCode::SUCCESS)
}
