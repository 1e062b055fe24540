mod record;

pub use self::record::{MetadataRecord, Source, UNKNOWN_CATEGORY, UNKNOWN_LANGUAGE};
