//! External metadata fetchers.
//!
//! A fetcher never fails from the caller's point of view: whatever goes wrong
//! (missing program, non-zero exit, garbage on stdout) is folded into a
//! [`FetchPayload`] so [`metadata::resolve`](crate::metadata::resolve) can
//! fall back without inspecting errors.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use shelver_extract::{FetchPayload, gallery_url, parse_payload};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::instrument;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, id: u64) -> FetchPayload;
}

pub type FetcherHandle = Arc<dyn MetadataFetcher>;

/// Always reports that nothing could be fetched.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

#[async_trait]
impl MetadataFetcher for OfflineFetcher {
    async fn fetch(&self, _id: u64) -> FetchPayload {
        FetchPayload::Error("offline".to_string())
    }
}

/// Runs a downloader in JSON mode (`gallery-dl -j <url>` by default) and
/// parses whatever it prints.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    program: PathBuf,
    args: Vec<String>,
    url_template: String,
    timeout: Duration,
}
impl CommandFetcher {
    /// `command` is the program followed by its leading arguments; the gallery
    /// URL is appended as the last argument. The program must be on `PATH`
    /// (or be a path to an executable).
    pub fn new(command: &[String], url_template: impl Into<String>) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            exn::bail!(ErrorKind::Unavailable("empty fetch command".to_string()));
        };
        let program = which::which(program).or_raise(|| ErrorKind::Unavailable(program.clone()))?;
        Ok(Self {
            program,
            args: args.to_vec(),
            url_template: url_template.into(),
            timeout: FETCH_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl MetadataFetcher for CommandFetcher {
    #[instrument(level = "debug", skip(self), fields(program = %self.program.display()))]
    async fn fetch(&self, id: u64) -> FetchPayload {
        let url = gallery_url(&self.url_template, id);
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return FetchPayload::Error(format!("could not run fetcher: {e}")),
            Err(_) => return FetchPayload::Error(format!("fetcher timed out after {}s", self.timeout.as_secs())),
        };
        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = parse_payload(&stdout);
        if output.status.success() {
            return payload;
        }
        tracing::debug!(
            %url,
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Fetcher exited unsuccessfully"
        );
        match payload {
            // The downloader usually explains itself on stdout, even on failure.
            error @ FetchPayload::Error(_) => error,
            _ => FetchPayload::Error(format!("fetcher exited with {}", output.status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline() {
        assert_eq!(OfflineFetcher.fetch(1).await, FetchPayload::Error("offline".to_string()));
    }

    #[test]
    fn test_missing_program() {
        let command = vec!["shelver-definitely-not-installed".to_string()];
        let err = CommandFetcher::new(&command, "https://example.invalid/{id}").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable(_)));
        assert!(CommandFetcher::new(&[], "https://example.invalid/{id}").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_is_parsed() {
        let command = vec!["echo".to_string(), r#"{"title": "Echoed", "url": ""#.to_string()];
        // `echo <json-prefix> <url>` prints the URL inside the JSON string.
        let fetcher = CommandFetcher::new(&command, "https://example.invalid/{id}\"}").unwrap();
        let FetchPayload::Valid(raw) = fetcher.fetch(42).await else {
            panic!("expected a valid payload");
        };
        assert_eq!(raw.title.as_deref(), Some("Echoed"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let fetcher = CommandFetcher::new(&["false".to_string()], "{id}").unwrap();
        assert!(matches!(fetcher.fetch(42).await, FetchPayload::Error(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unparseable_output_is_malformed() {
        let fetcher = CommandFetcher::new(&["echo".to_string()], "{id}").unwrap();
        assert_eq!(fetcher.fetch(42).await, FetchPayload::Malformed);
    }
}
