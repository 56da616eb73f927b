//! miningpoolfinder - crypto-mining pool hostname collector
//!
//! Merges threat-intel feeds and the pool statistics API into one
//! deduplicated JSON array.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use netfeeds::aggregator::PoolFinder;
use netfeeds::cli::PoolFinderCli;
use netfeeds::config::{EmptyOutput, PoolFinderConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PoolFinderCli::parse();
    cli.common.init_logging()?;

    let mut config = match &cli.config {
        Some(path) => PoolFinderConfig::load(path)?,
        None => PoolFinderConfig::default(),
    };
    cli.common.apply(&mut config.http);
    if cli.write_empty {
        config.empty_output = EmptyOutput::WriteEmpty;
    }
    if cli.skip_pool_stats {
        config.pool_stats.enabled = false;
    }
    if cli.tolerate_walk_failure {
        config.walk_failure_fatal = false;
    }
    config.validate()?;

    info!("miningpoolfinder generate pools");
    let mut finder = PoolFinder::new(config)?;
    let summary = finder.run().await?;

    let failed = summary.failures().count();
    if failed > 0 {
        warn!("{} of {} sources failed", failed, summary.outcomes.len());
    }

    let total = finder
        .write_json(&cli.output)
        .with_context(|| format!("Failed to write {:?}", cli.output))?;

    println!("mining pool address total '{}'", total);
    Ok(())
}
