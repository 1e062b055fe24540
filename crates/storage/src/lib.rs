pub mod error;
pub mod fs;
mod relocate;
mod sanitize;

pub use crate::fs::{Filesystem, LocalFilesystem, ReadOnlyFilesystem};
pub use crate::relocate::{Disposal, Placement, Relocator, TRASH_DIR_NAME, TrashPolicy};
pub use crate::sanitize::sanitize_segment;
use std::sync::Arc;

pub type FsHandle = Arc<dyn Filesystem + Send + Sync>;
