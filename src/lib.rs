//! # netfeeds - lookup table generators for network classification
//!
//! Two offline tools that crawl public sources and emit JSON tables:
//!
//! - **cdncheck** - CDN, WAF and Cloud provider IP ranges (per provider),
//!   scraped from ASN looking-glass pages and provider range lists
//! - **miningpoolfinder** - crypto-mining pool hostnames, merged from
//!   threat-intel feeds and a pool statistics API
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (clap)            cdncheck / miningpoolfinder          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)   provider.yaml, collector overrides   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls)                                 │
//! │    ├── Extractors: plain list, Sigma rule, CIDR regex, HTML │
//! │    └── PoolStatsWalker: token -> coins -> pools             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PoolFinder / RuleGenerator   merge + per-source isolation  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Output (serde_json + tempfile)   atomic JSON artifacts     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use netfeeds::aggregator::PoolFinder;
//! use netfeeds::config::PoolFinderConfig;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut finder = PoolFinder::new(PoolFinderConfig::default())?;
//!     finder.run().await?;
//!     let total = finder.write_json(Path::new("pools.json"))?;
//!     println!("{} pools", total);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`aggregator`] - Mining pool collection across sources
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - HTTP and collector configuration
//! - [`coverage`] - Address coverage of scraped CIDR lists
//! - [`error`] - Source-level error type
//! - [`extract`] - Identifier extractors
//! - [`fetcher`] - HTTP client
//! - [`output`] - Atomic JSON writers
//! - [`poolstats`] - Pool statistics API walker
//! - [`provider`] - CDN provider file
//! - [`rules`] - CDN/WAF/Cloud rule generation
//! - [`utils`] - Formatting helpers

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod output;
pub mod poolstats;
pub mod provider;
pub mod rules;
pub mod utils;

pub use config::{HttpConfig, PoolFinderConfig};
pub use error::FetchError;
