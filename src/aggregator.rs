//! Multi-source aggregation for the mining pool collector.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::{PoolFinderConfig, SourceDescriptor};
use crate::error::FetchError;
use crate::extract::extract;
use crate::fetcher::Fetcher;
use crate::output::write_pools;
use crate::poolstats::PoolStatsWalker;
use crate::utils::format_count;

/// Name under which the pool statistics walk is reported
pub const POOL_STATS_SOURCE: &str = "pool-stats";

/// Outcome of one source (a feed URL, the walk, or one walked coin)
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub name: String,
    /// Identifiers extracted, or the error text
    pub result: Result<usize, String>,
}

/// Per-source results of a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<SourceOutcome>,
}

impl RunSummary {
    fn record(&mut self, name: impl Into<String>, result: Result<usize, String>) {
        self.outcomes.push(SourceOutcome {
            name: name.into(),
            result,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Ok(_) => None,
            Err(e) => Some((o.name.as_str(), e.as_str())),
        })
    }
}

/// Collects mining pool identifiers from every configured source.
///
/// Owns the HTTP client and the identifier set for the duration of one
/// run. A failing source is logged and recorded; it never stops the others.
pub struct PoolFinder {
    fetcher: Fetcher,
    config: PoolFinderConfig,
    values: HashSet<String>,
}

impl PoolFinder {
    pub fn new(config: PoolFinderConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&config.http)?;
        Ok(Self::with_fetcher(fetcher, config))
    }

    pub fn with_fetcher(fetcher: Fetcher, config: PoolFinderConfig) -> Self {
        Self {
            fetcher,
            config,
            values: HashSet::new(),
        }
    }

    /// Number of distinct identifiers collected so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge identifiers, returning how many were new
    pub fn insert_all<I>(&mut self, identifiers: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.values.len();
        self.values
            .extend(identifiers.into_iter().filter(|id| !id.is_empty()));
        self.values.len() - before
    }

    /// Collected identifiers, sorted
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.values.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Fetch every static source, then walk the pool statistics API.
    ///
    /// Fails only when the walk cannot start and `walk_failure_fatal` is
    /// set, or when every single source failed.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let sources = self.config.sources.clone();

        for source in &sources {
            self.run_source(source, &mut summary).await;
        }

        if self.config.pool_stats.enabled {
            self.run_pool_stats(&mut summary).await?;
        }

        for (name, err) in summary.failures() {
            warn!("Source failed: {}: {}", name, err);
        }

        if !summary.outcomes.is_empty() && summary.succeeded() == 0 {
            error!("No source could be collected");
            anyhow::bail!("All {} sources failed", summary.outcomes.len());
        }

        info!(
            "Collected {} identifiers from {}/{} sources",
            format_count(self.len()),
            summary.succeeded(),
            summary.outcomes.len()
        );

        Ok(summary)
    }

    async fn run_source(&mut self, source: &SourceDescriptor, summary: &mut RunSummary) {
        for url in &source.urls {
            info!("Requesting {}...", url);
            match self.fetch_source(source, url).await {
                Ok(ids) => {
                    let found = ids.len();
                    let added = self.insert_all(ids);
                    info!("{}: {} entries ({} new)", url, found, added);
                    summary.record(url.as_str(), Ok(found));
                }
                Err(e) => {
                    warn!("Failed to collect {} ({}): {}", url, source.format, e);
                    summary.record(url.as_str(), Err(e.to_string()));
                }
            }
        }
    }

    async fn fetch_source(
        &self,
        source: &SourceDescriptor,
        url: &str,
    ) -> Result<Vec<String>, FetchError> {
        let content = self.fetcher.fetch(url).await?;
        extract(source.format, &content)
    }

    async fn run_pool_stats(&mut self, summary: &mut RunSummary) -> Result<()> {
        info!("Crawling {} ...", self.config.pool_stats.site_url);
        let walked = PoolStatsWalker::new(&self.fetcher, &self.config.pool_stats)
            .walk()
            .await;

        match walked {
            Ok(outcome) => {
                let found = outcome.hosts.len();
                for (coin, err) in &outcome.failed {
                    summary.record(format!("{}:{}", POOL_STATS_SOURCE, coin), Err(err.clone()));
                }
                let added = self.insert_all(outcome.hosts);
                info!(
                    "{}: {} coins, {} pool hosts ({} new)",
                    POOL_STATS_SOURCE, outcome.coins, found, added
                );
                summary.record(POOL_STATS_SOURCE, Ok(found));
                Ok(())
            }
            Err(e) if self.config.walk_failure_fatal => {
                Err(e).context("Pool statistics walk failed")
            }
            Err(e) => {
                warn!("Pool statistics walk failed: {}", e);
                summary.record(POOL_STATS_SOURCE, Err(e.to_string()));
                Ok(())
            }
        }
    }

    /// Write the collected identifiers to `path` as a JSON array
    pub fn write_json(&self, path: &Path) -> Result<usize> {
        write_pools(path, &self.identifiers(), self.config.empty_output)
    }
}
