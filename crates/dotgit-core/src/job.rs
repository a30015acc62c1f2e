//! Dump job definition.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::path::sanitize_dir_name;
use crate::url::normalize_url;

/// PKCS#12 client certificate used for mutual TLS against the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCertificate {
    /// Path to the `.p12` bundle.
    pub path: PathBuf,
    /// Bundle password (empty when unset).
    #[serde(default)]
    pub password: String,
}

/// One request to reconstruct a repository from an exposed `.git` directory.
///
/// Created once per invocation and immutable afterwards. The destination is
/// stored with `:` replaced by `_`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpJob {
    /// The URL as supplied by the caller.
    url: String,

    /// Directory the repository is reconstructed into.
    destination: PathBuf,

    /// Per-request timeout.
    #[serde(default = "default_timeout", with = "duration_secs")]
    timeout: Duration,

    /// Transport-level retries per request.
    #[serde(default = "default_retries")]
    retries: u32,

    /// Requested parallelism. Accepted for compatibility, fetches within a
    /// job are sequential.
    #[serde(default = "default_jobs")]
    jobs: u32,

    /// Extra headers sent with every request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,

    /// Optional client certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_certificate: Option<ClientCertificate>,

    /// Optional proxy URL (http, https, socks5, socks5h).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proxy: Option<String>,

    /// Version-control executable used for the final checkout.
    #[serde(default = "default_git_executable")]
    git_executable: String,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retries() -> u32 {
    3
}

fn default_jobs() -> u32 {
    1
}

fn default_git_executable() -> String {
    "git".to_string()
}

impl DumpJob {
    /// Creates a new builder for DumpJob.
    pub fn builder() -> DumpJobBuilder {
        DumpJobBuilder::default()
    }

    /// Returns the URL as supplied.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the normalized site URL that `.git/` lives under.
    pub fn base_url(&self) -> String {
        normalize_url(&self.url)
    }

    /// Returns the destination directory.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the transport retry count.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Returns the requested parallelism.
    pub fn jobs(&self) -> u32 {
        self.jobs
    }

    /// Returns the extra request headers.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the client certificate, if any.
    pub fn client_certificate(&self) -> Option<&ClientCertificate> {
        self.client_certificate.as_ref()
    }

    /// Returns the proxy URL, if any.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Returns the checkout executable.
    pub fn git_executable(&self) -> &str {
        &self.git_executable
    }
}

/// Builder for DumpJob.
#[derive(Debug, Default)]
pub struct DumpJobBuilder {
    url: Option<String>,
    destination: Option<PathBuf>,
    timeout: Option<Duration>,
    retries: Option<u32>,
    jobs: Option<u32>,
    headers: BTreeMap<String, String>,
    client_certificate: Option<ClientCertificate>,
    proxy: Option<String>,
    git_executable: Option<String>,
}

impl DumpJobBuilder {
    /// Sets the source URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the destination directory.
    pub fn destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the transport retry count.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Sets the requested parallelism.
    pub fn jobs(mut self, jobs: u32) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Adds a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replaces all request headers.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers = headers.into_iter().collect();
        self
    }

    /// Sets a PKCS#12 client certificate.
    pub fn client_certificate(
        mut self,
        path: impl Into<PathBuf>,
        password: impl Into<String>,
    ) -> Self {
        self.client_certificate = Some(ClientCertificate {
            path: path.into(),
            password: password.into(),
        });
        self
    }

    /// Sets a proxy URL.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Sets the checkout executable.
    pub fn git_executable(mut self, executable: impl Into<String>) -> Self {
        self.git_executable = Some(executable.into());
        self
    }

    /// Builds the job.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidJob` if required fields are missing or
    /// invalid, and `CoreError::InvalidUrl` for non-http(s) URLs.
    pub fn build(self) -> Result<DumpJob> {
        let url = self
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CoreError::invalid_job("url", "url is required"))?;

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::invalid_url(
                url,
                "only http and https URLs are supported",
            ));
        }

        let destination = self
            .destination
            .ok_or_else(|| CoreError::invalid_job("destination", "destination is required"))?;
        let destination = PathBuf::from(sanitize_dir_name(&destination.to_string_lossy()));

        let timeout = self.timeout.unwrap_or_else(default_timeout);
        if timeout.is_zero() {
            return Err(CoreError::invalid_job("timeout", "timeout must be positive"));
        }

        let git_executable = self
            .git_executable
            .unwrap_or_else(default_git_executable);
        if git_executable.trim().is_empty() {
            return Err(CoreError::invalid_job(
                "gitExecutable",
                "executable cannot be empty",
            ));
        }

        Ok(DumpJob {
            url,
            destination,
            timeout,
            retries: self.retries.unwrap_or_else(default_retries),
            jobs: self.jobs.unwrap_or_else(default_jobs).max(1),
            headers: self.headers,
            client_certificate: self.client_certificate,
            proxy: self.proxy.filter(|p| !p.trim().is_empty()),
            git_executable,
        })
    }
}

mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let job = DumpJob::builder()
            .url("http://example.com/.git/")
            .destination("/tmp/out")
            .build()
            .unwrap();

        assert_eq!(job.url(), "http://example.com/.git/");
        assert_eq!(job.base_url(), "http://example.com");
        assert_eq!(job.destination(), Path::new("/tmp/out"));
        assert_eq!(job.timeout(), Duration::from_secs(30));
        assert_eq!(job.retries(), 3);
        assert_eq!(job.jobs(), 1);
        assert_eq!(job.git_executable(), "git");
        assert!(job.headers().is_empty());
        assert!(job.proxy().is_none());
    }

    #[test]
    fn test_builder_full() {
        let job = DumpJob::builder()
            .url("https://example.com")
            .destination("/tmp/example.com:8443")
            .timeout(Duration::from_secs(5))
            .retries(1)
            .jobs(8)
            .header("User-Agent", "dotgit")
            .client_certificate("/certs/client.p12", "secret")
            .proxy("socks5h://127.0.0.1:9050")
            .git_executable("/usr/bin/git")
            .build()
            .unwrap();

        assert_eq!(job.destination(), Path::new("/tmp/example.com_8443"));
        assert_eq!(job.timeout(), Duration::from_secs(5));
        assert_eq!(job.retries(), 1);
        assert_eq!(job.jobs(), 8);
        assert_eq!(job.headers().get("User-Agent").map(String::as_str), Some("dotgit"));
        assert_eq!(job.client_certificate().unwrap().password, "secret");
        assert_eq!(job.proxy(), Some("socks5h://127.0.0.1:9050"));
        assert_eq!(job.git_executable(), "/usr/bin/git");
    }

    #[test]
    fn test_builder_missing_url() {
        let err = DumpJob::builder().destination("/tmp/x").build().unwrap_err();
        assert!(err.is_invalid_job());
    }

    #[test]
    fn test_builder_rejects_scheme() {
        let err = DumpJob::builder()
            .url("file:///etc")
            .destination("/tmp/x")
            .build()
            .unwrap_err();
        assert!(err.is_invalid_url());
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = DumpJob::builder()
            .url("http://example.com")
            .destination("/tmp/x")
            .timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_roundtrip_uses_camel_case() {
        let job = DumpJob::builder()
            .url("http://example.com")
            .destination("/tmp/x")
            .build()
            .unwrap();

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"gitExecutable\":\"git\""));
        assert!(json.contains("\"timeout\":30"));

        let back: DumpJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.url(), job.url());
        assert_eq!(back.timeout(), job.timeout());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let job: DumpJob =
            serde_json::from_str(r#"{"url":"http://h","destination":"/tmp/h"}"#).unwrap();
        assert_eq!(job.retries(), 3);
        assert_eq!(job.timeout(), Duration::from_secs(30));
    }
}
