//! Neutralizes dangerous directives in a fetched `.git/config`.
//!
//! A dumped config is attacker-controlled. Before any checkout runs against
//! it, every directive that can make git execute a command or read another
//! file is commented out. Comment lines are never touched, so running the
//! sanitizer twice changes nothing the second time.

use std::path::Path;

use tracing::warn;

use crate::error::Result;

/// Fragments that disable a line wherever they appear in it.
const DENIED_FRAGMENTS: &[&str] = &["fsmonitor", "sshcommand", "askpass", "editor", "pager"];

/// Keys that disable a line in any section.
const DENIED_KEYS: &[&str] = &[
    "hookspath",
    "gitproxy",
    "smudge",
    "clean",
    "process",
    "textconv",
    "helper",
    "external",
];

/// Rewrites git config text line by line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigSanitizer;

impl ConfigSanitizer {
    /// Returns the sanitized text and whether anything changed.
    pub fn sanitize(content: &str) -> (String, bool) {
        let mut out = String::with_capacity(content.len() + 64);
        let mut changed = false;
        let mut section = String::new();
        let mut continuation = false;

        for line in content.split_inclusive('\n') {
            let body = line.trim_end_matches(['\n', '\r']);
            let trimmed = body.trim_start();

            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continuation = false;
                out.push_str(line);
                continue;
            }

            if trimmed.starts_with('[') {
                section = section_name(trimmed);
            }

            let deny = continuation || (!trimmed.is_empty() && is_denied(trimmed, &section));
            if deny {
                let indent = &body[..body.len() - trimmed.len()];
                out.push_str(indent);
                out.push_str("# ");
                out.push_str(&line[indent.len()..]);
                changed = true;
                continuation = trimmed.ends_with('\\');
            } else {
                out.push_str(line);
            }
        }

        (out, changed)
    }

    /// Sanitizes a config file in place. Returns true if it was altered.
    pub async fn sanitize_file(path: &Path) -> Result<bool> {
        let raw = tokio::fs::read(path).await?;
        let content = String::from_utf8_lossy(&raw);

        let (sanitized, changed) = Self::sanitize(&content);
        if changed {
            warn!("'{}' file was altered", path.display());
            tokio::fs::write(path, sanitized).await?;
        }
        Ok(changed)
    }
}

fn is_denied(line: &str, section: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    if DENIED_FRAGMENTS.iter().any(|f| lower.contains(f)) {
        return true;
    }

    // A header may carry a key on the same line: `[core] hooksPath = x`.
    let key_part = if lower.starts_with('[') {
        match lower.find(']') {
            Some(end) => lower[end + 1..].trim_start(),
            None => return false,
        }
    } else {
        lower.as_str()
    };

    let key = key_part
        .split(['=', ' ', '\t'])
        .next()
        .unwrap_or_default()
        .trim();
    if key.is_empty() {
        return false;
    }

    if DENIED_KEYS.contains(&key) {
        return true;
    }

    key == "path" && (section == "include" || section == "includeif")
}

/// Lowercased section name of a header line: `[includeIf "gitdir:x"]` is
/// `includeif`, `[remote "origin"]` is `remote`.
fn section_name(header: &str) -> String {
    header
        .trim_start_matches('[')
        .split([']', ' ', '\t', '"', '.'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}
