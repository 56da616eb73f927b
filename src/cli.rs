//! CLI argument parsing with clap.

use clap::{Args, Parser};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::HttpConfig;

/// Options shared by both tools
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Skip TLS certificate verification (trusts any certificate the peer presents)
    #[arg(long)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,
}

impl CommonArgs {
    /// Apply command-line overrides on top of configured HTTP settings
    pub fn apply(&self, http: &mut HttpConfig) {
        if self.insecure {
            http.insecure_tls = true;
        }
        if let Some(secs) = self.timeout {
            http.timeout_secs = secs;
        }
    }

    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::ERROR
        } else {
            Level::INFO
        }
    }

    /// Install the global tracing subscriber
    pub fn init_logging(&self) -> anyhow::Result<()> {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(self.log_level())
            .with_target(false)
            .with_thread_ids(false)
            .without_time()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(())
    }
}

/// Generate CDN/WAF/Cloud IP rules from a provider file
#[derive(Parser, Debug)]
#[command(name = "cdncheck")]
#[command(author, version, about = "Generate CDN/WAF/Cloud IP range rules")]
pub struct CdnCheckCli {
    /// Provider definition file
    #[arg(long, default_value = "provider.yaml")]
    pub input: PathBuf,

    /// Rules output file
    #[arg(long, default_value = "rules.json")]
    pub output: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Collect crypto-mining pool hostnames
#[derive(Parser, Debug)]
#[command(name = "miningpoolfinder")]
#[command(author, version, about = "Collect crypto-mining pool hostnames")]
pub struct PoolFinderCli {
    /// Pools output file
    #[arg(long, default_value = "pools.json")]
    pub output: PathBuf,

    /// Optional YAML file overriding sources and endpoints
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write an empty array when nothing was collected
    #[arg(long)]
    pub write_empty: bool,

    /// Do not crawl the pool statistics API
    #[arg(long)]
    pub skip_pool_stats: bool,

    /// Keep going when the pool statistics API cannot be walked
    #[arg(long)]
    pub tolerate_walk_failure: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}
