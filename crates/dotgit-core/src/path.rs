//! Path traversal guard for server-supplied relative paths.
//!
//! Every path that comes from a remote server (anchors in an index page,
//! ref names found in fetched files) is checked here before it is joined
//! under a destination directory.

use crate::error::{CoreError, Result};

/// Validates relative paths against a fixed root.
///
/// A path is safe when it is relative and every segment stays below the
/// root. The check is purely lexical: nothing on disk is consulted, so the
/// answer is the same before and after the file is written.
///
/// # Example
///
/// ```
/// use dotgit_core::PathGuard;
///
/// assert!(PathGuard::is_safe(".git/objects/ab/cdef"));
/// assert!(PathGuard::is_safe("refs/heads/main"));
/// assert!(!PathGuard::is_safe("../outside"));
/// assert!(!PathGuard::is_safe("/etc/passwd"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PathGuard;

impl PathGuard {
    /// Returns true if `path` can be joined under a root without escaping it.
    ///
    /// Rejected:
    /// - empty paths
    /// - absolute paths (leading `/` or `\`) and drive-prefixed paths (`C:`)
    /// - any `..` segment, wherever it appears
    /// - embedded NUL bytes
    pub fn is_safe(path: &str) -> bool {
        if path.is_empty() || path.contains('\0') {
            return false;
        }

        if path.starts_with('/') || path.starts_with('\\') {
            return false;
        }

        let bytes = path.as_bytes();
        if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
            return false;
        }

        let mut depth = 0usize;
        for segment in path.split(['/', '\\']) {
            match segment {
                "" | "." => {},
                ".." => return false,
                _ => depth += 1,
            }
        }

        depth > 0
    }

    /// Returns the path unchanged if it is safe, otherwise an `UnsafePath` error.
    pub fn check(path: &str) -> Result<&str> {
        if Self::is_safe(path) {
            Ok(path)
        } else {
            Err(CoreError::unsafe_path(path))
        }
    }
}

/// Replaces characters that are illegal in directory names on common
/// filesystems (currently `:`) with `_`.
pub fn sanitize_dir_name(name: &str) -> String {
    name.replace(':', "_")
}
