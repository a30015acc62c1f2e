//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use dotgit_core::DumpJob;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Identity, Proxy};
use tracing::{debug, warn};

use super::{FetchResponse, Transport};
use crate::error::{DumpError, Result};

/// Base delay between retries; attempt `n` waits `n` times this.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Transport over a configured [`reqwest::Client`].
///
/// Redirects are never followed and certificate verification is off:
/// exposed targets commonly sit behind self-signed certificates.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    retries: u32,
}

impl HttpTransport {
    /// Builds a client from the job's timeout, headers, client certificate
    /// and proxy settings.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::InvalidConfig` for unusable headers, certificate
    /// or proxy, and `DumpError::Io` if the certificate cannot be read.
    pub fn from_job(job: &DumpJob) -> Result<Self> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .danger_accept_invalid_certs(true)
            .timeout(job.timeout())
            .default_headers(header_map(job)?);

        if let Some(cert) = job.client_certificate() {
            let der = std::fs::read(&cert.path)?;
            let identity = Identity::from_pkcs12_der(&der, &cert.password)
                .map_err(|e| DumpError::config(format!("client certificate: {e}")))?;
            builder = builder.identity(identity);
        }

        if let Some(proxy) = job.proxy() {
            let proxy =
                Proxy::all(proxy).map_err(|e| DumpError::config(format!("proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DumpError::config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: job.base_url(),
            retries: job.retries(),
        })
    }

    async fn get_once(&self, url: &str) -> reqwest::Result<FetchResponse> {
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let location = header(LOCATION);
        let body = response.bytes().await?;

        Ok(FetchResponse {
            status,
            content_type,
            location,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<FetchResponse> {
        let url = self.url_for(path);
        let mut attempt = 0;

        loop {
            match self.get_once(&url).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    debug!("Retrying {} ({}/{}): {}", url, attempt, self.retries, e);
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                },
                Err(e) => {
                    warn!("Giving up on {} after {} attempts: {}", url, attempt + 1, e);
                    return Err(DumpError::transport(path, e.to_string()));
                },
            }
        }
    }
}

fn header_map(job: &DumpJob) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in job.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DumpError::config(format!("header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| DumpError::config(format!("header value for '{name}': {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
