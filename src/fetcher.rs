//! HTTP fetcher for downloading feeds, provider pages and API responses.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::FetchError;

/// A downloaded response body with its declared media type
#[derive(Debug, Clone)]
pub struct Fetched {
    pub url: String,
    pub body: String,
    pub content_type: Option<String>,
}

impl Fetched {
    /// True when the server declared the body as an HTML page
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                ct.split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .eq_ignore_ascii_case("text/html")
            })
            .unwrap_or(false)
    }
}

/// HTTP client for fetching sources.
///
/// One instance is built per run and passed by reference to whatever
/// needs network access. Requests are issued one at a time; nothing here
/// retries.
pub struct Fetcher {
    client: Client,
    max_body_bytes: usize,
}

impl Fetcher {
    /// Create a fetcher from the HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self> {
        if config.insecure_tls {
            warn!("TLS certificate verification is disabled for this run");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(config.max_idle_per_host)
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Fetch a URL and return its body
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.fetch_with_headers(url, HeaderMap::new()).await?.body)
    }

    /// Fetch a URL keeping the declared content type
    pub async fn fetch_document(&self, url: &str) -> Result<Fetched, FetchError> {
        self.fetch_with_headers(url, HeaderMap::new()).await
    }

    /// Fetch a URL with extra request headers.
    ///
    /// Non-2xx responses are returned as [`FetchError::Status`]. An empty
    /// URL is [`FetchError::NotFound`].
    pub async fn fetch_with_headers(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<Fetched, FetchError> {
        if url.trim().is_empty() {
            return Err(FetchError::NotFound("empty URL".to_string()));
        }

        debug!("GET {}", url);
        let response = self.client.get(url).headers(headers).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.to_string(),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    size: content_length as usize,
                    max: self.max_body_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?;

        // Content-Length may be absent for chunked bodies
        if bytes.len() > self.max_body_bytes {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                size: bytes.len(),
                max: self.max_body_bytes,
            });
        }

        Ok(Fetched {
            url: url.to_string(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
            content_type,
        })
    }
}
