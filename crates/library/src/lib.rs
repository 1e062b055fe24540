//! The organizer engine: duplicate resolution, metadata and alias
//! resolution, and placement of gallery files into the library layout.
//!
//! Single-file operations ([`organize::organize_file`], [`predict::predict`],
//! [`metadata::resolve`]) are plain async functions. Batches
//! ([`organize::organize`], [`dedup::dedup`]) are streams of progress events
//! that run a bounded number of files at a time and can be cancelled between
//! files through [`Context::cancel`].

pub mod alias;
pub mod candidates;
pub mod categories;
mod context;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod metadata;
pub mod organize;
pub mod predict;

pub use crate::context::{Context, DEFAULT_WORKERS};
