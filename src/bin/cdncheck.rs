//! cdncheck - CDN/WAF/Cloud IP rule generator
//!
//! Reads a provider file, scrapes announced prefixes and provider range
//! lists, and writes the rules JSON.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use netfeeds::cli::CdnCheckCli;
use netfeeds::config::HttpConfig;
use netfeeds::rules::generate_file;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CdnCheckCli::parse();
    cli.common.init_logging()?;

    let mut http = HttpConfig::default();
    cli.common.apply(&mut http);

    info!("cdncheck generate rules");
    let rules = generate_file(&cli.input, &cli.output, &http).await?;

    let total: usize = [&rules.cdn, &rules.waf, &rules.cloud]
        .iter()
        .flat_map(|m| m.values())
        .map(Vec::len)
        .sum();

    println!("[OK] {} CIDRs written to {}", total, cli.output.display());
    Ok(())
}
