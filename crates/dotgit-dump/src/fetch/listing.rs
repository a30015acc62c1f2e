//! Directory index page parsing.

use std::sync::LazyLock;

use dotgit_core::PathGuard;
use regex::Regex;

static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("anchor regex is valid")
});

/// Returns the relative paths linked from a directory index page.
///
/// Links with a scheme (`http:`, `mailto:`, ...) or a host (`//host/x`) are
/// dropped, query strings and fragments are stripped, and every survivor
/// must pass [`PathGuard`]. Parent-directory and sort links therefore never
/// come back.
pub fn indexed_files(html: &str) -> Vec<String> {
    ANCHOR_HREF
        .captures_iter(html)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3)))
        .filter_map(|href| relative_path(href.as_str()))
        .collect()
}

fn relative_path(href: &str) -> Option<String> {
    let href = href.trim().replace("&amp;", "&");
    if href.starts_with("//") || url::Url::parse(&href).is_ok() {
        return None;
    }

    let path = href.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_start_matches("./");
    if path.is_empty() || path == "." || !PathGuard::is_safe(path) {
        return None;
    }
    Some(path.to_string())
}
