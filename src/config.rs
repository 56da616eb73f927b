//! Configuration management for netfeeds.
//!
//! Both tools run fine on defaults. The mining-pool collector can load
//! an optional YAML file to override its source list, the pool-stats
//! endpoints, or the HTTP client settings. Unknown keys are ignored.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::extract::SourceFormat;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum size accepted for a single response body (10 MB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Number of per-coin fetches between session token refreshes
pub const DEFAULT_REFRESH_EVERY: usize = 30;

/// HTTP client settings shared by both tools
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Response timeout
    pub timeout_secs: u64,

    /// Skip TLS certificate verification.
    ///
    /// Some crawled endpoints serve self-signed or frequently rotated
    /// certificates. Turning this on trusts whatever certificate the peer
    /// presents; it is an explicit operator opt-in and stays off by default.
    pub insecure_tls: bool,

    /// Idle connections kept per host (0 disables connection reuse)
    pub max_idle_per_host: usize,

    /// Per-response body size cap
    pub max_body_bytes: usize,

    /// User-Agent sent when a request carries no header set of its own
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            insecure_tls: false,
            max_idle_per_host: 0,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            user_agent: format!("netfeeds/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A statically declared feed: one format, one or more URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub format: SourceFormat,
    pub urls: Vec<String>,
}

impl SourceDescriptor {
    pub fn new<S: AsRef<str>>(format: SourceFormat, urls: &[S]) -> Self {
        Self {
            format,
            urls: urls.iter().map(|u| u.as_ref().to_string()).collect(),
        }
    }
}

/// Default threat-intel feeds listing mining pool hosts
pub fn default_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(
            SourceFormat::PlainText,
            &["https://raw.githubusercontent.com/stamparm/maltrail/master/trails/static/suspicious/crypto_mining.txt"],
        ),
        SourceDescriptor::new(
            SourceFormat::Sigma,
            &[
                "https://raw.githubusercontent.com/SigmaHQ/sigma/master/rules/network/dns/net_dns_pua_cryptocoin_mining_xmr.yml",
                "https://raw.githubusercontent.com/SigmaHQ/sigma/master/rules/windows/network_connection/net_connection_win_crypto_mining.yml",
                "https://raw.githubusercontent.com/SigmaHQ/sigma/master/rules/network/zeek/zeek_dns_mining_pools.yml",
            ],
        ),
    ]
}

/// Endpoints and pacing of the pool statistics API walk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolStatsConfig {
    pub enabled: bool,

    /// Base of the JSON data endpoints (`time`, `coins_data.js`, `<coin>.js`)
    pub data_url: String,

    /// Public site the API expects as origin/referer
    pub site_url: String,

    /// Refresh the session token after this many per-coin fetches
    pub refresh_every: usize,
}

impl Default for PoolStatsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_url: "https://data.miningpoolstats.stream/data".to_string(),
            site_url: "https://miningpoolstats.stream".to_string(),
            refresh_every: DEFAULT_REFRESH_EVERY,
        }
    }
}

/// What to do when a run collected nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyOutput {
    /// Leave the output path untouched
    #[default]
    Skip,
    /// Write an empty JSON array
    WriteEmpty,
}

/// Mining-pool collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolFinderConfig {
    pub sources: Vec<SourceDescriptor>,
    pub pool_stats: PoolStatsConfig,
    pub http: HttpConfig,
    pub empty_output: EmptyOutput,

    /// Abort the run when the pool-stats walk cannot get a token or the
    /// coin listing. When false the walk is treated like any other failed
    /// source.
    pub walk_failure_fatal: bool,
}

impl Default for PoolFinderConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            pool_stats: PoolStatsConfig::default(),
            http: HttpConfig::default(),
            empty_output: EmptyOutput::Skip,
            walk_failure_fatal: true,
        }
    }
}

impl PoolFinderConfig {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: PoolFinderConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for source in &self.sources {
            if source.urls.is_empty() {
                anyhow::bail!("Source of type '{}' has no URLs", source.format);
            }
            for url in &source.urls {
                validate_url(url)?;
            }
        }

        if self.pool_stats.enabled {
            validate_url(&self.pool_stats.data_url)?;
            validate_url(&self.pool_stats.site_url)?;
            if self.pool_stats.refresh_every == 0 {
                anyhow::bail!("pool_stats.refresh_every must be at least 1");
            }
        }

        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be at least 1");
        }

        Ok(())
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use http or https: {}", url);
    }
    Ok(())
}
