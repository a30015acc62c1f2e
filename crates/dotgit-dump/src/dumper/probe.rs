//! Repository presence probe and strategy selection.

use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::error::{DumpError, Result};
use crate::fetch::indexed_files;
use crate::transport::Transport;

static HEAD_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(ref:.*|[0-9a-f]{40}$)").expect("HEAD regex is valid"));

/// How the repository contents are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `.git/` is browsable; download it recursively.
    Listing,
    /// No listing; enumerate well-known paths and walk the object graph.
    Blind,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Blind => "blind",
        }
    }
}

/// Returns true if `text` looks like the content of `.git/HEAD`.
pub fn is_head_content(text: &str) -> bool {
    HEAD_CONTENT.is_match(text.trim())
}

/// Fetches `.git/HEAD` and checks that it is a usable HEAD file.
///
/// # Errors
///
/// Returns `DumpError::Probe` when the response is invalid or the body is
/// neither a symbolic ref nor an object id, and `DumpError::Transport`
/// when the server cannot be reached.
pub async fn probe_head(transport: &dyn Transport) -> Result<()> {
    let path = ".git/HEAD";
    let url = transport.url_for(path);
    info!("Testing {}", url);

    let response = transport.get(path).await?;
    if let Err(reason) = response.validate() {
        return Err(DumpError::Probe(format!("error: {url} {reason}")));
    }
    if !is_head_content(&response.text()) {
        return Err(DumpError::Probe(format!("error: {url} is not a git HEAD file")));
    }
    Ok(())
}

/// Chooses [`Strategy::Listing`] when `.git/` is an HTML index page that
/// lists `HEAD`.
pub async fn select_strategy(transport: &dyn Transport) -> Strategy {
    let path = ".git/";
    info!("Testing {}", transport.url_for(path));

    match transport.get(path).await {
        Ok(response)
            if response.status == 200
                && response.is_html()
                && indexed_files(&response.text()).iter().any(|f| f == "HEAD") =>
        {
            Strategy::Listing
        },
        _ => Strategy::Blind,
    }
}
