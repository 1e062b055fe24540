//! Filename identity extraction and metadata record normalization.
//!
//! Gallery files carry their identity in their names: a numeric gallery ID
//! (conventionally as a trailing `(12345)` before the extension) and, often,
//! the author as a leading `[Author]` bracket. This crate turns filenames into
//! those identities, and turns whatever the external metadata fetcher printed
//! into a tagged [`FetchPayload`] exactly once, so nothing downstream ever has
//! to inspect raw JSON shapes.

mod consts;
pub mod error;
mod identity;
pub mod models;
pub mod payload;

pub use crate::identity::{Sentinel, extract_author, extract_id, file_name, matches_extension, split_extension};
pub use crate::models::{MetadataRecord, Source};
pub use crate::payload::{FetchPayload, ID_PLACEHOLDER, RawGallery, gallery_url, parse_payload};
