mod author;
mod category;
mod gallery;

pub use self::author::{AuthorAlias, AuthorSetting};
pub(crate) use self::author::AuthorSettingRow;
pub use self::category::Category;
pub use self::gallery::GalleryRecord;
pub(crate) use self::gallery::GalleryRow;
