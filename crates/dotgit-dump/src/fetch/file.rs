//! Single-file download.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::FetchContext;
use crate::error::Result;
use crate::frontier::TaskHandler;

/// Downloads a path expected to be a plain file. Never discovers tasks.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    ctx: FetchContext,
}

impl FileFetcher {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskHandler<String> for FileFetcher {
    async fn handle(&self, path: &String) -> Result<Vec<String>> {
        if self.ctx.is_downloaded(path).await {
            debug!("Skipping {}: already downloaded", path);
            return Ok(Vec::new());
        }

        if let Some(response) = self.ctx.fetch_valid(path).await
            && let Err(e) = self.ctx.write(path, &response.body).await
        {
            warn!("Could not store {}: {}", path, e);
        }
        Ok(Vec::new())
    }
}
