//! Walker for the mining pool statistics JSON API.
//!
//! The API is crawled in three steps:
//!
//! 1. `GET {data}/time?t=<unix>` returns a decimal session token
//! 2. `GET {data}/coins_data.js?t=<token>` lists every coin page
//! 3. `GET {data}/<page>.js?t=<token>` lists the pools of one coin
//!
//! Failing steps 1 or 2 aborts the walk. A failing coin is logged and
//! skipped. A fresh token is requested before the first coin and then
//! before every `refresh_every` coins; if the refresh fails the previous
//! token is kept.

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::PoolStatsConfig;
use crate::error::FetchError;
use crate::fetcher::Fetcher;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36";

/// Session token handed out by the time endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SessionToken(i64);

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Deserialize)]
struct CoinsData {
    #[serde(default)]
    data: Vec<CoinEntry>,
}

#[derive(Debug, Deserialize)]
struct CoinEntry {
    #[serde(default)]
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinPoolsData {
    #[serde(default)]
    data: Vec<PoolEntry>,
}

#[derive(Debug, Deserialize)]
struct PoolEntry {
    #[serde(default)]
    url: Option<String>,
}

enum WalkState {
    NeedToken,
    Listing(SessionToken),
    PerKeyFetch {
        token: SessionToken,
        coins: std::vec::IntoIter<String>,
        processed: usize,
    },
    Done,
}

/// Result of a completed walk
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Pool hosts in the order they were seen (may repeat)
    pub hosts: Vec<String>,
    /// Number of coins listed
    pub coins: usize,
    /// Coins whose pool list could not be fetched, with the error
    pub failed: Vec<(String, String)>,
    /// Token requests issued, including the initial one
    pub token_requests: usize,
}

/// Crawler for the pool statistics API
pub struct PoolStatsWalker<'a> {
    fetcher: &'a Fetcher,
    data_url: String,
    refresh_every: usize,
    headers: HeaderMap,
}

impl<'a> PoolStatsWalker<'a> {
    pub fn new(fetcher: &'a Fetcher, config: &PoolStatsConfig) -> Self {
        Self {
            fetcher,
            data_url: config.data_url.trim_end_matches('/').to_string(),
            refresh_every: config.refresh_every.max(1),
            headers: browser_headers(&config.data_url, &config.site_url),
        }
    }

    /// Run the whole walk and collect pool hosts
    pub async fn walk(&self) -> Result<WalkOutcome, FetchError> {
        let mut outcome = WalkOutcome::default();
        let mut state = WalkState::NeedToken;

        loop {
            state = match state {
                WalkState::NeedToken => {
                    outcome.token_requests += 1;
                    WalkState::Listing(self.session_token().await?)
                }
                WalkState::Listing(token) => {
                    let coins = self.coins(token).await?;
                    info!("Crawling {} coins", coins.len());
                    outcome.coins = coins.len();
                    WalkState::PerKeyFetch {
                        token,
                        coins: coins.into_iter(),
                        processed: 0,
                    }
                }
                WalkState::PerKeyFetch {
                    mut token,
                    mut coins,
                    processed,
                } => match coins.next() {
                    None => WalkState::Done,
                    Some(coin) => {
                        if processed % self.refresh_every == 0 {
                            outcome.token_requests += 1;
                            match self.session_token().await {
                                Ok(fresh) => token = fresh,
                                Err(e) => warn!("Token refresh failed, keeping {}: {}", token, e),
                            }
                        }

                        match self.coin_pools(&coin, token).await {
                            Ok(urls) => {
                                info!("Crawled '{}': {} pools", coin, urls.len());
                                outcome
                                    .hosts
                                    .extend(urls.iter().filter_map(|u| pool_host(u)));
                            }
                            Err(e) => {
                                warn!("Failed to crawl '{}' pools: {}", coin, e);
                                outcome.failed.push((coin, e.to_string()));
                            }
                        }

                        WalkState::PerKeyFetch {
                            token,
                            coins,
                            processed: processed + 1,
                        }
                    }
                },
                WalkState::Done => break,
            };
        }

        Ok(outcome)
    }

    async fn session_token(&self) -> Result<SessionToken, FetchError> {
        let url = format!("{}/time?t={}", self.data_url, Utc::now().timestamp());
        let body = self
            .fetcher
            .fetch_with_headers(&url, self.headers.clone())
            .await?
            .body;

        let token = body
            .trim()
            .parse::<i64>()
            .map(SessionToken)
            .map_err(|_| FetchError::InvalidToken(body.trim().to_string()))?;
        debug!("Session token {}", token);
        Ok(token)
    }

    async fn coins(&self, token: SessionToken) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/coins_data.js?t={}", self.data_url, token);
        let body = self
            .fetcher
            .fetch_with_headers(&url, self.headers.clone())
            .await?
            .body;
        let listing: CoinsData = serde_json::from_str(&body)?;

        Ok(listing
            .data
            .into_iter()
            .filter_map(|c| c.page)
            .filter(|page| !page.is_empty())
            .collect())
    }

    async fn coin_pools(&self, coin: &str, token: SessionToken) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/{}.js?t={}", self.data_url, coin, token);
        let body = self
            .fetcher
            .fetch_with_headers(&url, self.headers.clone())
            .await?
            .body;
        let pools: CoinPoolsData = serde_json::from_str(&body)?;

        Ok(pools.data.into_iter().filter_map(|p| p.url).collect())
    }
}

/// Host component of a pool URL, keeping an explicit port
pub fn pool_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str().filter(|h| !h.is_empty())?;

    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Header set of a browser visiting the stats site. Requests without
/// these are rejected by the API.
fn browser_headers(data_url: &str, site_url: &str) -> HeaderMap {
    let site = site_url.trim_end_matches('/');
    let authority = Url::parse(data_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    let pairs = [
        ("authority", authority),
        ("accept", "application/json, text/javascript, */*; q=0.01".to_string()),
        ("user-agent", BROWSER_USER_AGENT.to_string()),
        ("sec-gpc", "1".to_string()),
        ("origin", site.to_string()),
        ("sec-fetch-site", "same-site".to_string()),
        ("sec-fetch-mode", "cors".to_string()),
        ("sec-fetch-dest", "empty".to_string()),
        ("referer", format!("{}/", site)),
        ("accept-language", "en,en-US;q=0.9".to_string()),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        match HeaderValue::from_str(&value) {
            Ok(v) if !value.is_empty() => {
                headers.insert(HeaderName::from_static(name), v);
            }
            _ => debug!("Skipping header {}: {:?}", name, value),
        }
    }
    headers
}
