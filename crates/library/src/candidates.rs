//! Where candidate files come from: a directory walk, explicit paths, or an
//! external search index.

use crate::error::{ErrorKind, Result};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use shelver_extract::matches_extension;
use shelver_storage::{FsHandle, TRASH_DIR_NAME};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;

/// Whether any directory between `root` and `path` is a trash folder.
fn in_trash(path: &Path, root: Option<&Path>) -> bool {
    let relative = root.and_then(|root| path.strip_prefix(root).ok()).unwrap_or(path);
    relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .any(|c| matches!(c, Component::Normal(name) if name == OsStr::new(TRASH_DIR_NAME)))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name().and_then(OsStr::to_str).is_some_and(|name| matches_extension(name, extension))
}

/// Every file below `root` with the given extension, skipping anything that
/// already sits in a trash folder. Unreadable directories are logged and
/// skipped.
pub fn walk<'a>(fs: &'a FsHandle, root: &'a Path, extension: &'a str) -> impl Stream<Item = PathBuf> + Send + 'a {
    stream! {
        let mut entries = fs.walk(root);
        while let Some(entry) = entries.next().await {
            match entry {
                Ok(path) if has_extension(&path, extension) && !in_trash(&path, Some(root)) => yield path,
                Ok(_) => {},
                Err(e) => tracing::warn!(root = %root.display(), error = ?e, "Skipping unreadable directory"),
            }
        }
    }
}

/// Candidate files collected so far, in discovery order.
///
/// A file is identified by its canonical path, so the same file reached
/// through a relative path, a `..` or a symlinked directory is only kept
/// once, under the first spelling seen. Anything inside the shared trash
/// directory is left out.
pub struct CandidateSet<'a> {
    fs: &'a FsHandle,
    trash: Option<PathBuf>,
    seen: HashSet<PathBuf>,
    files: Vec<PathBuf>,
}
impl<'a> CandidateSet<'a> {
    /// `trash` is the shared trash directory, if one is configured.
    pub async fn new(fs: &'a FsHandle, trash: Option<&Path>) -> Self {
        let trash = match trash {
            Some(dir) => match fs.canonicalize(dir).await {
                Ok(dir) => Some(dir),
                // Nothing can be inside a trash directory that doesn't exist yet.
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = ?e, "Trash directory not resolved");
                    None
                },
            },
            None => None,
        };
        Self { fs, trash, seen: HashSet::new(), files: Vec::new() }
    }

    /// Add `path` unless it is already in the set or sits in the shared
    /// trash. Returns whether it was added.
    pub async fn insert(&mut self, path: PathBuf) -> bool {
        let canonical = match self.fs.canonicalize(&path).await {
            Ok(canonical) => canonical,
            // Kept under its own spelling; whatever touches it next reports
            // the problem.
            Err(e) => {
                tracing::debug!(path = %path.display(), error = ?e, "Could not resolve candidate path");
                path.clone()
            },
        };
        if let Some(trash) = &self.trash
            && canonical.starts_with(trash)
        {
            tracing::debug!(path = %path.display(), "Skipping file in the trash directory");
            return false;
        }
        if !self.seen.insert(canonical) {
            tracing::debug!(path = %path.display(), "Skipping file already listed");
            return false;
        }
        self.files.push(path);
        true
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_vec(self) -> Vec<PathBuf> {
        self.files
    }
}

/// Expand a mix of files and directories into candidate files, in the order
/// given. Directories are walked; files are kept if they have the
/// extension. Each file is kept once, however it was reached, and nothing
/// from `trash` (the shared trash directory) is returned.
#[instrument(level = "debug", skip(fs, inputs))]
pub async fn expand(fs: &FsHandle, inputs: &[PathBuf], extension: &str, trash: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut files = CandidateSet::new(fs, trash).await;
    for input in inputs {
        if fs.is_dir(input).await.or_raise(|| ErrorKind::Candidates)? {
            let found: Vec<PathBuf> = walk(fs, input, extension).collect().await;
            tracing::debug!(dir = %input.display(), files = found.len(), "Walked directory");
            for path in found {
                files.insert(path).await;
            }
        } else if !has_extension(input, extension) {
            tracing::warn!(path = %input.display(), %extension, "Not a gallery archive, skipping");
        } else if !fs.exists(input).await.or_raise(|| ErrorKind::Candidates)? {
            tracing::warn!(path = %input.display(), "File not found, skipping");
        } else {
            files.insert(input.clone()).await;
        }
    }
    Ok(files.into_vec())
}

/// An external index that can find files by keyword anywhere on disk.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Paths the index reports for `keyword`, unverified.
    async fn query(&self, keyword: &str, extension: &str) -> Result<Vec<PathBuf>>;
}

/// The `es` command line client of the Everything search engine.
#[derive(Debug, Clone)]
pub struct EverythingSearch {
    program: PathBuf,
}
impl EverythingSearch {
    pub fn new(program: &str) -> Result<Self> {
        let program = which::which(program).or_raise(|| ErrorKind::Unavailable(program.to_string()))?;
        Ok(Self { program })
    }
}

#[async_trait]
impl SearchIndex for EverythingSearch {
    #[instrument(level = "debug", skip(self))]
    async fn query(&self, keyword: &str, extension: &str) -> Result<Vec<PathBuf>> {
        let output = Command::new(&self.program)
            .arg(keyword)
            .arg(format!("*.{}", extension.trim_start_matches('.')))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .or_raise(|| ErrorKind::Unavailable(self.program.display().to_string()))?;
        if !output.status.success() {
            exn::bail!(ErrorKind::Unavailable(format!(
                "{} exited with {}",
                self.program.display(),
                output.status
            )));
        }
        // The index may print in a legacy code page; undecodable bytes are
        // replaced and the path then fails the existence check below.
        Ok(parse_lines(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn parse_lines(output: &str) -> Vec<PathBuf> {
    output.lines().map(str::trim).filter(|line| !line.is_empty()).map(PathBuf::from).collect()
}

/// Files the index knows for `keyword`, restricted to existing files with the
/// extension that are not in a trash folder.
#[instrument(level = "debug", skip(index, fs))]
pub async fn search(
    index: &dyn SearchIndex,
    fs: &FsHandle,
    keyword: &str,
    extension: &str,
    trash: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let reported = index.query(keyword, extension).await.or_raise(|| ErrorKind::Candidates)?;
    let total = reported.len();
    let mut found = CandidateSet::new(fs, trash).await;
    for path in reported {
        if !has_extension(&path, extension) || in_trash(&path, None) {
            continue;
        }
        if fs.exists(&path).await.or_raise(|| ErrorKind::Candidates)? {
            found.insert(path).await;
        }
    }
    tracing::debug!(reported = total, kept = found.len(), "Search results verified");
    Ok(found.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelver_storage::LocalFilesystem;
    use std::sync::Arc;

    fn fs() -> FsHandle {
        Arc::new(LocalFilesystem)
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"zip").unwrap();
    }

    struct FixedIndex(Vec<PathBuf>);

    #[async_trait]
    impl SearchIndex for FixedIndex {
        async fn query(&self, _keyword: &str, _extension: &str) -> Result<Vec<PathBuf>> {
            Ok(self.0.clone())
        }
    }

    #[rstest]
    #[case("/a/_trash/x.cbz", None, true)]
    #[case("/a/b/x.cbz", None, false)]
    #[case("/a/_trash_old/x.cbz", None, false)]
    // The root itself may be called anything.
    #[case("/_trash/lib/x.cbz", Some("/_trash"), false)]
    #[case("/lib/_trash/x.cbz", Some("/lib"), true)]
    fn test_in_trash(#[case] path: &str, #[case] root: Option<&str>, #[case] expected: bool) {
        assert_eq!(in_trash(Path::new(path), root.map(Path::new)), expected);
    }

    #[test]
    fn test_parse_lines() {
        let lines = parse_lines("C:\\a\\x (1).cbz\r\n\r\n  D:\\y (2).cbz  \n");
        assert_eq!(lines, [PathBuf::from("C:\\a\\x (1).cbz"), PathBuf::from("D:\\y (2).cbz")]);
    }

    #[tokio::test]
    async fn test_walk_filters() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a (1).cbz"));
        touch(&dir.path().join("nested/b (2).CBZ"));
        touch(&dir.path().join("nested/notes.txt"));
        touch(&dir.path().join("_trash/a (1).cbz"));
        let fs = fs();
        let mut found: Vec<PathBuf> = walk(&fs, dir.path(), "cbz").collect().await;
        found.sort();
        assert_eq!(found, [dir.path().join("a (1).cbz"), dir.path().join("nested/b (2).CBZ")]);
    }

    #[tokio::test]
    async fn test_expand_mixed_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("single (3).cbz");
        touch(&single);
        touch(&dir.path().join("folder/inner (4).cbz"));
        let inputs = vec![
            single.clone(),
            dir.path().join("folder"),
            dir.path().join("missing (5).cbz"),
            dir.path().join("readme.md"),
            single.clone(),
        ];
        let files = expand(&fs(), &inputs, "cbz", None).await.unwrap();
        assert_eq!(files, [single, dir.path().join("folder/inner (4).cbz")]);
    }

    #[tokio::test]
    async fn test_search_verifies_results() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("hit (1).cbz");
        touch(&present);
        touch(&dir.path().join("_trash/hit (1).cbz"));
        let index = FixedIndex(vec![
            present.clone(),
            dir.path().join("gone (2).cbz"),
            dir.path().join("_trash/hit (1).cbz"),
            dir.path().join("hit.txt"),
            present.clone(),
        ]);
        let found = search(&index, &fs(), "hit", "cbz", None).await.unwrap();
        assert_eq!(found, [present]);
    }

    #[tokio::test]
    async fn test_expand_same_file_under_two_spellings() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        let only = lib.join("[A] Only Copy (42).cbz");
        touch(&only);
        let inputs = vec![lib.clone(), lib.join("..").join("lib"), only.clone()];
        let files = expand(&fs(), &inputs, "cbz", None).await.unwrap();
        assert_eq!(files, [only]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_expand_through_symlinked_directory() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        touch(&lib.join("A (1).cbz"));
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&lib, &link).unwrap();
        let files = expand(&fs(), &[link, lib.clone()], "cbz", None).await.unwrap();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_expand_skips_shared_trash() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        touch(&lib.join("a/T (7).cbz"));
        touch(&lib.join("bin/T (7).cbz"));
        let trash = lib.join("bin");
        let files = expand(&fs(), &[lib.clone()], "cbz", Some(&trash)).await.unwrap();
        assert_eq!(files, [lib.join("a/T (7).cbz")]);
        // A relative spelling of the trash directory is recognized too.
        let spelled = lib.join("a/../bin");
        let files = expand(&fs(), &[lib.clone()], "cbz", Some(&spelled)).await.unwrap();
        assert_eq!(files, [lib.join("a/T (7).cbz")]);
        // A trash directory that doesn't exist yet excludes nothing.
        let files = expand(&fs(), &[lib.join("a")], "cbz", Some(&dir.path().join("none"))).await.unwrap();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_search_skips_shared_trash() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("lib/hit (1).cbz");
        let binned = dir.path().join("bin/hit (1).cbz");
        touch(&live);
        touch(&binned);
        let index = FixedIndex(vec![binned, live.clone()]);
        let found = search(&index, &fs(), "hit", "cbz", Some(&dir.path().join("bin"))).await.unwrap();
        assert_eq!(found, [live]);
    }
}
