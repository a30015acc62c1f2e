//! Frontier handlers that fetch, persist and expand.
//!
//! Each fetcher issues at most one request per task. Failures of a single
//! task (transport errors, invalid responses, write errors, decode errors)
//! are logged and turn into an empty follow-up list; they never abort the
//! enclosing pass.

mod directory;
mod file;
mod listing;
mod objects;
mod refs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dotgit_core::PathGuard;
use tracing::{info, warn};

use crate::error::Result;
use crate::transport::{FetchResponse, Transport};

pub use directory::DirectoryFetcher;
pub use file::FileFetcher;
pub use listing::indexed_files;
pub use objects::ObjectFetcher;
pub use refs::{RefFinder, find_refs};

/// What every fetcher needs: where to read from and where to write to.
#[derive(Clone)]
pub struct FetchContext {
    transport: Arc<dyn Transport>,
    destination: PathBuf,
}

impl FetchContext {
    /// Creates a context writing below `destination`.
    pub fn new(transport: Arc<dyn Transport>, destination: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            destination: destination.into(),
        }
    }

    /// Returns the transport.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Returns the destination root.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Returns the local path of a repository-relative path.
    pub fn local_path(&self, path: &str) -> PathBuf {
        self.destination.join(path)
    }

    /// Returns true if `path` was already written.
    pub async fn is_downloaded(&self, path: &str) -> bool {
        tokio::fs::metadata(self.local_path(path))
            .await
            .is_ok_and(|m| m.is_file())
    }

    /// Issues the request and logs the status line. Transport failures are
    /// logged and become `None`.
    pub async fn fetch(&self, path: &str) -> Option<FetchResponse> {
        match self.transport.get(path).await {
            Ok(response) => {
                info!("Fetching {} [{}]", self.transport.url_for(path), response.status);
                Some(response)
            },
            Err(e) => {
                warn!("Fetching {} failed: {}", self.transport.url_for(path), e);
                None
            },
        }
    }

    /// Like [`fetch`](Self::fetch), but also applies the validity rule.
    pub async fn fetch_valid(&self, path: &str) -> Option<FetchResponse> {
        let response = self.fetch(path).await?;
        match response.validate() {
            Ok(()) => Some(response),
            Err(reason) => {
                warn!("{} {}", self.transport.url_for(path), reason);
                None
            },
        }
    }

    /// Writes `bytes` to the repository-relative `path`, creating parent
    /// directories. The path must pass [`PathGuard`].
    pub async fn write(&self, path: &str, bytes: &[u8]) -> Result<PathBuf> {
        PathGuard::check(path)?;
        let local = self.local_path(path);
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&local, bytes).await?;
        Ok(local)
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("base_url", &self.transport.base_url())
            .field("destination", &self.destination)
            .finish()
    }
}
