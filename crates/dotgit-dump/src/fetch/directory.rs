//! Recursive download of a listable `.git/` directory.

use async_trait::async_trait;
use dotgit_core::PathGuard;
use tracing::{debug, warn};

use super::{FetchContext, indexed_files};
use crate::error::Result;
use crate::frontier::TaskHandler;

/// Walks directory index pages and downloads every linked file.
///
/// Tasks ending in `/` are treated as directories: their index page is
/// parsed and every linked entry becomes a new task. Anything else is a
/// file and is written verbatim.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    ctx: FetchContext,
}

impl DirectoryFetcher {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }

    fn expand(&self, path: &str, html: &str) -> Vec<String> {
        indexed_files(html)
            .into_iter()
            .map(|entry| format!("{path}{entry}"))
            .filter(|task| PathGuard::is_safe(task))
            .collect()
    }
}

#[async_trait]
impl TaskHandler<String> for DirectoryFetcher {
    async fn handle(&self, path: &String) -> Result<Vec<String>> {
        let is_dir = path.ends_with('/');
        if !is_dir && self.ctx.is_downloaded(path).await {
            debug!("Skipping {}: already downloaded", path);
            return Ok(Vec::new());
        }

        let Some(response) = self.ctx.fetch(path).await else {
            return Ok(Vec::new());
        };

        if response.redirects_to_directory(path) {
            return Ok(vec![format!("{path}/")]);
        }

        if is_dir {
            if response.status != 200 || !response.is_html() {
                warn!(
                    "{} is not a directory index [{}]",
                    self.ctx.transport().url_for(path),
                    response.status
                );
                return Ok(Vec::new());
            }
            return Ok(self.expand(path, &response.text()));
        }

        if let Err(reason) = response.validate() {
            warn!("{} {}", self.ctx.transport().url_for(path), reason);
            return Ok(Vec::new());
        }

        if let Err(e) = self.ctx.write(path, &response.body).await {
            warn!("Could not store {}: {}", path, e);
        }
        Ok(Vec::new())
    }
}
