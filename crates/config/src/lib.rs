//! Layered configuration.
//!
//! Values are merged, last one winning, from:
//! 1. built-in defaults,
//! 2. a configuration file: an explicitly given one, else the first of
//!    `shelver.{toml,yaml,yml,json}` in the working directory, else
//!    `config.{toml,yaml,json}` in the platform configuration directory,
//! 3. `SHELVER_*` environment variables (`SHELVER_FETCH__ENABLED=false` sets
//!    `fetch.enabled`),
//! 4. caller-supplied overrides, typically command-line flags.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::{Figment, Provider};
use serde::{Deserialize, Serialize};
use shelver_extract::ID_PLACEHOLDER;
use std::path::{Path, PathBuf};
use tracing::instrument;

const ENV_PREFIX: &str = "SHELVER_";
const LOCAL_CANDIDATES: [&str; 4] = ["shelver.toml", "shelver.yaml", "shelver.yml", "shelver.json"];
const USER_CANDIDATES: [&str; 3] = ["config.toml", "config.yaml", "config.json"];

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "shelver")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite store location.
    pub database: PathBuf,
    /// Default base directory for organized files.
    pub library: Option<PathBuf>,
    /// Extension of the archives to work on, without the dot.
    pub extension: String,
    /// Shared trash directory instead of `_trash` next to each file.
    pub trash_dir: Option<PathBuf>,
    /// Delete duplicates right after moving them to the trash.
    pub purge: bool,
    /// Refuse to organize files whose metadata could not be fetched.
    pub strict: bool,
    /// Files processed concurrently by batch operations.
    pub workers: usize,
    /// Accepted spellings of the "no author" marker; the first is canonical.
    pub no_author: Vec<String>,
    pub fetch: FetchConfig,
    pub search: SearchConfig,
}
impl Default for Config {
    fn default() -> Self {
        let database = project_dirs()
            .map(|dirs| dirs.data_dir().join("shelver.db"))
            .unwrap_or_else(|| PathBuf::from("shelver.db"));
        Self {
            database,
            library: None,
            extension: "cbz".to_string(),
            trash_dir: None,
            purge: false,
            strict: false,
            workers: 3,
            no_author: vec!["N_A".to_string(), "N／A".to_string()],
            fetch: FetchConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub enabled: bool,
    /// Program and leading arguments; the gallery URL is appended.
    pub command: Vec<String>,
    /// Gallery URL template containing `{id}`.
    pub url: String,
}
impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["gallery-dl".to_string(), "-j".to_string()],
            url: "https://hitomi.la/galleries/{id}.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// File search index command line client.
    pub command: String,
}
impl Default for SearchConfig {
    fn default() -> Self {
        Self { command: "es".to_string() }
    }
}

impl Config {
    /// Load, merge and validate the configuration.
    #[instrument(level = "debug", skip(overrides))]
    pub fn load(file: Option<&Path>, overrides: impl Provider) -> Result<Self> {
        let config: Self = Self::figment(file)?.merge(overrides).extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Every layer except caller overrides.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_file(figment, &path)?;
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn discover() -> Option<PathBuf> {
        let local = LOCAL_CANDIDATES.iter().map(PathBuf::from);
        let user = project_dirs()
            .map(|dirs| USER_CANDIDATES.iter().map(|name| dirs.config_dir().join(name)).collect::<Vec<_>>())
            .unwrap_or_default();
        local.chain(user).find(|path| path.is_file())
    }

    fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        Ok(match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            exn::bail!(ErrorKind::InvalidValue("workers", "must be at least 1"));
        }
        if self.extension.trim_start_matches('.').trim().is_empty() {
            exn::bail!(ErrorKind::InvalidValue("extension", "must not be empty"));
        }
        if self.no_author.iter().all(|s| s.trim().is_empty()) {
            exn::bail!(ErrorKind::InvalidValue("no_author", "needs at least one spelling"));
        }
        if self.fetch.enabled && !self.fetch.url.contains(ID_PLACEHOLDER) {
            exn::bail!(ErrorKind::InvalidValue("fetch.url", "must contain {id}"));
        }
        if self.fetch.enabled && self.fetch.command.first().is_none_or(|program| program.trim().is_empty()) {
            exn::bail!(ErrorKind::InvalidValue("fetch.command", "must name a program"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn no_overrides() -> Figment {
        Figment::new()
    }

    #[derive(Serialize)]
    struct Overrides {
        workers: usize,
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load(None, no_overrides()).unwrap();
            assert_eq!(config.extension, "cbz");
            assert_eq!(config.workers, 3);
            assert_eq!(config.no_author, ["N_A", "N／A"]);
            assert!(config.fetch.enabled);
            assert!(!config.purge);
            assert!(!config.strict);
            assert_eq!(config.search.command, "es");
            Ok(())
        });
    }

    #[test]
    fn test_local_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "shelver.toml",
                r#"
                    library = "/srv/library"
                    workers = 8
                    [fetch]
                    enabled = true
                    url = "https://example.invalid/g/{id}"
                "#,
            )?;
            jail.set_env("SHELVER_WORKERS", "2");
            jail.set_env("SHELVER_FETCH__ENABLED", "false");
            let config = Config::load(None, no_overrides()).unwrap();
            assert_eq!(config.library.as_deref(), Some(Path::new("/srv/library")));
            assert_eq!(config.workers, 2);
            assert!(!config.fetch.enabled);
            assert_eq!(config.fetch.url, "https://example.invalid/g/{id}");
            // Untouched nested values keep their defaults.
            assert_eq!(config.fetch.command, ["gallery-dl", "-j"]);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file("shelver.yml", "purge: true\nno_author: [Anonymous]\n")?;
            let config = Config::load(None, no_overrides()).unwrap();
            assert!(config.purge);
            assert_eq!(config.no_author, ["Anonymous"]);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_and_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.json", r#"{"extension": "zip", "strict": true}"#)?;
            let overrides = Serialized::defaults(Overrides { workers: 1 });
            let config = Config::load(Some(Path::new("custom.json")), overrides).unwrap();
            assert_eq!(config.extension, "zip");
            assert!(config.strict);
            assert_eq!(config.workers, 1);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml")), no_overrides()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "workers = 2").unwrap();
        let err = Config::load(Some(&path), no_overrides()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_malformed_value() {
        Jail::expect_with(|jail| {
            jail.create_file("shelver.toml", r#"workers = "many""#)?;
            let err = Config::load(None, no_overrides()).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Parse));
            Ok(())
        });
    }

    #[rstest]
    #[case::no_workers(|c: &mut Config| c.workers = 0, "workers")]
    #[case::no_extension(|c: &mut Config| c.extension = ".".to_string(), "extension")]
    #[case::no_sentinel(|c: &mut Config| c.no_author = vec![" ".to_string()], "no_author")]
    #[case::no_placeholder(|c: &mut Config| c.fetch.url = "https://example.invalid/".to_string(), "fetch.url")]
    #[case::no_program(|c: &mut Config| c.fetch.command.clear(), "fetch.command")]
    fn test_validate(#[case] mutate: fn(&mut Config), #[case] field: &str) {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        mutate(&mut config);
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidValue(f, _) if *f == field));
    }

    #[test]
    fn test_disabled_fetch_skips_fetch_checks() {
        let mut config = Config::default();
        config.fetch.enabled = false;
        config.fetch.url = String::new();
        config.fetch.command.clear();
        assert!(config.validate().is_ok());
    }
}
