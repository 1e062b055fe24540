//! Author aliases: alternate spellings mapped to one primary name.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelver_cache::{AuthorAlias, Repository};
use tracing::instrument;

/// The canonical author for an observed name: the primary it is an alias
/// of, or the name itself. Exactly one lookup is made, so `A -> B -> C`
/// resolves `A` to `B`.
pub async fn canonical_author(cache: &Repository, observed: &str) -> Result<String> {
    cache.resolve_primary(observed.trim()).await.or_raise(|| ErrorKind::Alias)
}

/// Make `alias` resolve to `primary`, replacing any previous mapping.
#[instrument(level = "debug", skip(cache))]
pub async fn register(cache: &Repository, alias: &str, primary: &str) -> Result<()> {
    if alias.trim() == primary.trim() {
        tracing::warn!(%alias, "Alias and primary are the same name, nothing to register");
        return Ok(());
    }
    cache.add_alias(alias, primary).await.or_raise(|| ErrorKind::Alias)?;
    tracing::info!(%alias, %primary, "Registered alias");
    Ok(())
}

pub async fn list(cache: &Repository) -> Result<Vec<AuthorAlias>> {
    cache.list_aliases().await.or_raise(|| ErrorKind::Alias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelver_cache::Database;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let cache = Repository::from(&Database::connect_in_memory().await.unwrap());
        register(&cache, "Acme Studio", "Acme").await.unwrap();
        assert_eq!(canonical_author(&cache, " Acme Studio ").await.unwrap(), "Acme");
        assert_eq!(canonical_author(&cache, "Someone").await.unwrap(), "Someone");
        // Self-aliases are ignored rather than stored.
        register(&cache, "Acme", "Acme").await.unwrap();
        let aliases = list(&cache).await.unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].alias, "Acme Studio");
        assert!(register(&cache, "", "Acme").await.is_err());
    }
}
