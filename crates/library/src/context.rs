use crate::fetch::{FetcherHandle, OfflineFetcher};
use shelver_extract::Sentinel;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Files processed concurrently by batch operations unless configured otherwise.
pub const DEFAULT_WORKERS: usize = 3;

/// Settings and collaborators shared by every library operation.
///
/// Built once from configuration and passed by reference; nothing in the
/// library reads global state.
#[derive(Clone)]
pub struct Context {
    /// Extension (without the dot) of the files batches work on.
    pub extension: String,
    pub sentinel: Sentinel,
    /// Upper bound on files in flight within a batch.
    pub workers: usize,
    /// Refuse to organize a file whose metadata had to be synthesized.
    pub strict: bool,
    pub fetcher: FetcherHandle,
    /// Checked before each new file of a batch is started.
    pub cancel: CancellationToken,
}
impl Default for Context {
    fn default() -> Self {
        Self {
            extension: "cbz".to_string(),
            sentinel: Sentinel::default(),
            workers: DEFAULT_WORKERS,
            strict: false,
            fetcher: Arc::new(OfflineFetcher),
            cancel: CancellationToken::new(),
        }
    }
}
impl Context {
    pub fn with_fetcher(mut self, fetcher: FetcherHandle) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_sentinel(mut self, sentinel: Sentinel) -> Self {
        self.sentinel = sentinel;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
