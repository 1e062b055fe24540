//! Persistent store for the gallery organizer.
//!
//! Four tables back the organizer:
//! - **galleries**: one row per logical gallery id, written by organize runs.
//! - **author_settings**: the last category each canonical author was filed
//!   under. A prediction hint, never a constraint.
//! - **author_aliases**: one-hop alias to primary author mapping.
//! - **categories**: the category vocabulary with its display order.
//!
//! Schema creation and additive migrations run on connect.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{AuthorAlias, AuthorSetting, Category, GalleryRecord};
pub use crate::repo::Repository;
