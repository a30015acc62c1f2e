//! Transitive loose object download.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::FetchContext;
use crate::error::Result;
use crate::frontier::TaskHandler;
use crate::object::{LooseObject, ObjectId};

/// Downloads loose objects and follows commit and tree references.
///
/// Ids contained in a fetched pack are never requested. A local object
/// that fails to decode is deleted and fetched once more; a downloaded
/// object that fails to decode is deleted.
#[derive(Debug, Clone)]
pub struct ObjectFetcher {
    ctx: FetchContext,
    packed: Arc<HashSet<ObjectId>>,
}

impl ObjectFetcher {
    pub fn new(ctx: FetchContext, packed: Arc<HashSet<ObjectId>>) -> Self {
        Self { ctx, packed }
    }

    async fn read_local(&self, path: &str) -> Option<Vec<ObjectId>> {
        let raw = tokio::fs::read(self.ctx.local_path(path)).await.ok()?;
        match LooseObject::decode(&raw).and_then(|object| object.references()) {
            Ok(references) => Some(references),
            Err(e) => {
                warn!("Discarding corrupt local object {}: {}", path, e);
                self.discard(path).await;
                None
            },
        }
    }

    async fn discard(&self, path: &str) {
        if let Err(e) = tokio::fs::remove_file(self.ctx.local_path(path)).await {
            debug!("Could not remove {}: {}", path, e);
        }
    }
}

#[async_trait]
impl TaskHandler<ObjectId> for ObjectFetcher {
    async fn handle(&self, id: &ObjectId) -> Result<Vec<ObjectId>> {
        if self.packed.contains(id) {
            return Ok(Vec::new());
        }

        let path = id.loose_path();
        if self.ctx.is_downloaded(&path).await
            && let Some(references) = self.read_local(&path).await
        {
            return Ok(references);
        }

        let Some(response) = self.ctx.fetch_valid(&path).await else {
            return Ok(Vec::new());
        };
        if let Err(e) = self.ctx.write(&path, &response.body).await {
            warn!("Could not store {}: {}", path, e);
            return Ok(Vec::new());
        }

        match LooseObject::decode(&response.body).and_then(|object| object.references()) {
            Ok(references) => Ok(references),
            Err(e) => {
                warn!("Could not decode {}: {}", id, e);
                self.discard(&path).await;
                Ok(Vec::new())
            },
        }
    }
}
