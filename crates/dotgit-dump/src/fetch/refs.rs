//! Ref and reflog discovery.

use std::sync::LazyLock;

use async_trait::async_trait;
use dotgit_core::PathGuard;
use regex::Regex;
use tracing::warn;

use super::FetchContext;
use crate::error::Result;
use crate::frontier::TaskHandler;

static REF_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"refs(/[A-Za-z0-9._*-]+)+").expect("ref regex is valid"));

/// Returns the distinct ref names mentioned in `text`, in order of first
/// appearance. Wildcards (refspecs in `config`) and unsafe names are
/// skipped.
pub fn find_refs(text: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for name in REF_NAME.find_iter(text).map(|m| m.as_str()) {
        if name.contains('*') || !PathGuard::is_safe(name) {
            continue;
        }
        if !refs.iter().any(|r| r == name) {
            refs.push(name.to_string());
        }
    }
    refs
}

/// Downloads a file holding ref pointers or reflog lines and follows every
/// ref it names to the ref file and its reflog.
///
/// Unlike [`FileFetcher`](super::FileFetcher) this always issues the
/// request: a ref file may be named by several sources and must still be
/// scanned.
#[derive(Debug, Clone)]
pub struct RefFinder {
    ctx: FetchContext,
}

impl RefFinder {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskHandler<String> for RefFinder {
    async fn handle(&self, path: &String) -> Result<Vec<String>> {
        let Some(response) = self.ctx.fetch_valid(path).await else {
            return Ok(Vec::new());
        };

        if let Err(e) = self.ctx.write(path, &response.body).await {
            warn!("Could not store {}: {}", path, e);
            return Ok(Vec::new());
        }

        Ok(find_refs(&response.text())
            .into_iter()
            .flat_map(|name| [format!(".git/{name}"), format!(".git/logs/{name}")])
            .collect())
    }
}
