use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::UtcDateTime;

/// The category a canonical author's work was last filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSetting {
    pub author_name: String,
    pub default_category: String,
    pub updated_at: UtcDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AuthorSettingRow {
    author_name: String,
    default_category: String,
    updated_at: i64,
}
impl TryFrom<AuthorSettingRow> for AuthorSetting {
    type Error = Error;
    fn try_from(row: AuthorSettingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            author_name: row.author_name,
            default_category: row.default_category,
            updated_at: UtcDateTime::from_unix_timestamp(row.updated_at)
                .or_raise(|| ErrorKind::InvalidData("update date"))?,
        })
    }
}

/// A one-hop mapping from an alternate spelling to the primary author.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AuthorAlias {
    #[sqlx(rename = "alias_name")]
    pub alias: String,
    #[sqlx(rename = "primary_author_name")]
    pub primary: String,
}
