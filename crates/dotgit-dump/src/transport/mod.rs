//! HTTP access to the exposed repository.
//!
//! The engine only ever issues `GET {base}/{path}` without following
//! redirects. [`Transport`] abstracts that so the dumper can run against an
//! in-memory server in tests.

mod http;

use std::borrow::Cow;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub use http::HttpTransport;

/// A fully read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Bytes,
}

impl FetchResponse {
    /// Creates a response with a status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: None,
            location: None,
            body: body.into(),
        }
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the redirect location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Returns true if the declared content type is an HTML page.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }

    /// Checks the shared validity rule: status exactly 200, a non-empty
    /// body and a content type that is not HTML.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the response is not usable.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.status != 200 {
            return Err(format!("responded with status code {}", self.status));
        }
        if self.body.is_empty() {
            return Err("responded with a zero-length body".to_string());
        }
        if self.is_html() {
            return Err("responded with HTML".to_string());
        }
        Ok(())
    }

    /// Returns true for a 301/302 whose target is `path` plus a trailing
    /// slash, i.e. the server says `path` is a directory.
    pub fn redirects_to_directory(&self, path: &str) -> bool {
        matches!(self.status, 301 | 302)
            && self
                .location
                .as_deref()
                .is_some_and(|loc| loc.ends_with(&format!("{path}/")))
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Issues GET requests relative to the repository base URL.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the base URL requests are made against.
    fn base_url(&self) -> &str;

    /// Fetches `{base_url}/{path}` without following redirects.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::Transport` once transport-level retries are
    /// exhausted. HTTP error statuses are not errors.
    async fn get(&self, path: &str) -> Result<FetchResponse>;

    /// Returns the full URL of `path`.
    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_plain_200() {
        let response = FetchResponse::new(200, "ref: refs/heads/main\n")
            .with_content_type("application/octet-stream");
        assert!(response.validate().is_ok());
        assert_eq!(response.text(), "ref: refs/heads/main\n");
    }

    #[test]
    fn test_validate_reasons() {
        assert_eq!(
            FetchResponse::new(404, "x").validate().unwrap_err(),
            "responded with status code 404"
        );
        assert_eq!(
            FetchResponse::new(200, "").validate().unwrap_err(),
            "responded with a zero-length body"
        );
        assert_eq!(
            FetchResponse::new(200, "<html>")
                .with_content_type("text/html; charset=UTF-8")
                .validate()
                .unwrap_err(),
            "responded with HTML"
        );
    }

    #[test]
    fn test_redirects_to_directory() {
        let response = FetchResponse::new(301, "").with_location("http://h/.git/objects/");
        assert!(response.redirects_to_directory(".git/objects"));
        assert!(!response.redirects_to_directory(".git/refs"));

        let moved = FetchResponse::new(200, "x").with_location("http://h/.git/objects/");
        assert!(!moved.redirects_to_directory(".git/objects"));
    }

    #[test]
    fn test_is_html_is_case_insensitive() {
        assert!(FetchResponse::new(200, "x").with_content_type("Text/HTML").is_html());
        assert!(!FetchResponse::new(200, "x").is_html());
    }
}
