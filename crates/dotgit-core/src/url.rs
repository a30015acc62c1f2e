//! Source URL handling.

use crate::error::{CoreError, Result};
use crate::path::{PathGuard, sanitize_dir_name};

/// Normalizes a user-supplied repository URL into the site base URL.
///
/// Users paste all kinds of variants: the site root, the `.git` directory,
/// or the HEAD file itself. The normalized form is the URL under which
/// `.git/HEAD` lives, without a trailing slash.
///
/// Steps, in order: strip a trailing `HEAD`, trailing slashes, a trailing
/// `.git` suffix, and trailing slashes again.
///
/// # Example
///
/// ```
/// use dotgit_core::normalize_url;
///
/// assert_eq!(normalize_url("http://site/.git/HEAD"), "http://site");
/// assert_eq!(normalize_url("http://site/app/.git/"), "http://site/app");
/// assert_eq!(normalize_url("http://site/"), "http://site");
/// ```
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let url = url.strip_suffix("HEAD").unwrap_or(url);
    let url = url.trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    url.trim_end_matches('/').to_string()
}

/// Returns the scheme-less form of an http(s) URL, used to derive a
/// destination directory name (`https://host:8443/app` -> `host_8443/app`).
///
/// Fails for other schemes and for URLs whose host/path part would escape
/// the output root.
pub fn destination_name(url: &str) -> Result<String> {
    let normalized = normalize_url(url);
    let rest = normalized
        .strip_prefix("https://")
        .or_else(|| normalized.strip_prefix("http://"))
        .ok_or_else(|| CoreError::invalid_url(url, "only http and https URLs are supported"))?;

    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(CoreError::invalid_url(url, "missing host"));
    }

    let name = sanitize_dir_name(rest);
    PathGuard::check(&name)
        .map_err(|_| CoreError::invalid_url(url, "path escapes the output directory"))?;

    Ok(name)
}
