//! CDN/WAF/Cloud rule generation.
//!
//! For every provider of every category the generator scrapes the prefix
//! page of each ASN and each configured URL, and collects anything that
//! looks like an IPv4 CIDR. `common.fqdn` is passed through untouched.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::HttpConfig;
use crate::coverage;
use crate::error::FetchError;
use crate::extract::{find_cidrs, find_link, SERVICE_TAGS_MARKER};
use crate::fetcher::Fetcher;
use crate::output::write_json_atomic;
use crate::provider::{ProviderConfig, ProviderMap, ProviderSection};
use crate::utils::{format_addresses, format_count};

/// Looking glass serving announced prefixes per ASN
pub const DEFAULT_ASN_LOOKUP_URL: &str = "https://bgp.he.net";

/// Generated rules artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleOutput {
    pub cdn: ProviderMap,
    pub waf: ProviderMap,
    pub cloud: ProviderMap,
    pub fqdn: ProviderMap,
}

/// Scrapes provider prefixes into a [`RuleOutput`]
pub struct RuleGenerator {
    fetcher: Fetcher,
    asn_lookup_url: String,
}

impl RuleGenerator {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self::with_fetcher(Fetcher::new(http)?, DEFAULT_ASN_LOOKUP_URL))
    }

    pub fn with_fetcher(fetcher: Fetcher, asn_lookup_url: &str) -> Self {
        Self {
            fetcher,
            asn_lookup_url: asn_lookup_url.trim_end_matches('/').to_string(),
        }
    }

    /// Scrape every category. Source failures are logged and skipped.
    pub async fn generate(&self, provider: &ProviderConfig) -> RuleOutput {
        let mut rules = RuleOutput {
            fqdn: provider.common.fqdn.clone(),
            ..RuleOutput::default()
        };

        for (category, section) in provider.sections() {
            let collected = self.collect_section(category, section).await;
            summarize(category, &collected);
            match category {
                "cdn" => rules.cdn = collected,
                "waf" => rules.waf = collected,
                _ => rules.cloud = collected,
            }
        }

        rules
    }

    async fn collect_section(&self, category: &str, section: &ProviderSection) -> ProviderMap {
        let mut data = ProviderMap::new();
        info!(
            "Collecting {}: {} ASN providers, {} URL providers",
            category,
            section.asn.len(),
            section.urls.len()
        );

        for (provider, asns) in &section.asn {
            for asn in asns {
                match self.asn_prefixes(asn).await {
                    Ok(cidrs) if !cidrs.is_empty() => append_unique(&mut data, provider, cidrs),
                    Ok(_) => debug!("{} {}: no prefixes found", provider, asn),
                    Err(e) => warn!("Failed to fetch prefixes of {} ({}): {}", asn, provider, e),
                }
            }
        }

        for (provider, urls) in &section.urls {
            for url in urls {
                match self.url_cidrs(url).await {
                    Ok(cidrs) if !cidrs.is_empty() => append_unique(&mut data, provider, cidrs),
                    Ok(_) => debug!("{} {}: no CIDRs found", provider, url),
                    Err(e) => warn!("Failed to scrape {} ({}): {}", url, provider, e),
                }
            }
        }

        data
    }

    /// Prefixes announced by one ASN, scraped from the looking glass page
    pub async fn asn_prefixes(&self, asn: &str) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/{}#_prefixes", self.asn_lookup_url, asn);
        let body = self.fetcher.fetch(&url).await?;
        Ok(find_cidrs(&body))
    }

    /// CIDRs listed at a provider URL.
    ///
    /// An HTML answer is treated as a download page: the first link
    /// containing `ServiceTags_Public_` is fetched once and scraped instead.
    /// A page without such a link fails with [`FetchError::NotFound`].
    pub async fn url_cidrs(&self, url: &str) -> Result<Vec<String>, FetchError> {
        let mut document = self.fetcher.fetch_document(url).await?;

        if document.is_html() {
            let target = find_link(&document.body, SERVICE_TAGS_MARKER)
                .map(|href| resolve_link(&document.url, &href))
                .unwrap_or_default();
            debug!("{} is an HTML page, following {:?}", url, target);
            document = self.fetcher.fetch_document(&target).await?;
        }

        Ok(find_cidrs(&document.body))
    }
}

/// Resolve a possibly relative link against the page it was found on
fn resolve_link(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Append CIDRs to a provider's list, keeping first occurrences only
fn append_unique(data: &mut ProviderMap, provider: &str, cidrs: Vec<String>) {
    let entry = data.entry(provider.to_string()).or_default();
    let mut seen: HashSet<String> = entry.iter().cloned().collect();
    entry.extend(cidrs.into_iter().filter(|c| seen.insert(c.clone())));
}

fn summarize(category: &str, data: &ProviderMap) {
    for (provider, cidrs) in data {
        let cov = coverage::measure(cidrs);
        if cov.invalid > 0 {
            warn!(
                "{}/{}: {} of {} entries are not valid IPv4 networks",
                category, provider, cov.invalid, cov.entries
            );
        }
        info!(
            "{}/{}: {} CIDRs ({} addresses)",
            category,
            provider,
            format_count(cov.entries),
            format_addresses(cov.addresses)
        );
    }
}

/// Read the provider file, scrape everything, write the rules file
pub async fn generate_file(input: &Path, output: &Path, http: &HttpConfig) -> Result<RuleOutput> {
    let provider = ProviderConfig::load(input)?;
    let generator = RuleGenerator::new(http)?;

    let rules = generator.generate(&provider).await;

    write_json_atomic(output, &rules)
        .with_context(|| format!("Failed to write rules to {:?}", output))?;

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_unique() {
        let mut data = ProviderMap::new();
        append_unique(&mut data, "cf", vec!["1.0.0.0/24".into(), "1.1.1.0/24".into()]);
        append_unique(&mut data, "cf", vec!["1.1.1.0/24".into(), "2.0.0.0/8".into()]);
        append_unique(&mut data, "ak", vec!["3.0.0.0/8".into(), "3.0.0.0/8".into()]);
        assert_eq!(data["cf"], vec!["1.0.0.0/24", "1.1.1.0/24", "2.0.0.0/8"]);
        assert_eq!(data["ak"], vec!["3.0.0.0/8"]);
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link(
                "https://www.example.com/download/details.aspx?id=1",
                "/files/ServiceTags_Public_1.json"
            ),
            "https://www.example.com/files/ServiceTags_Public_1.json"
        );
        assert_eq!(
            resolve_link(
                "https://www.example.com/a",
                "https://cdn.example.net/ServiceTags_Public_2.json"
            ),
            "https://cdn.example.net/ServiceTags_Public_2.json"
        );
    }

    #[test]
    fn test_rule_output_json_shape() {
        let mut rules = RuleOutput::default();
        rules.cdn.insert("cloudflare".into(), vec!["1.1.1.0/24".into()]);
        rules.fqdn.insert("akamai".into(), vec!["akamai.net".into()]);
        let json = serde_json::to_value(&rules).unwrap();
        assert_eq!(json["cdn"]["cloudflare"][0], "1.1.1.0/24");
        assert!(json["waf"].as_object().unwrap().is_empty());
        assert!(json["cloud"].as_object().unwrap().is_empty());
        assert_eq!(json["fqdn"]["akamai"][0], "akamai.net");
    }

    #[tokio::test]
    async fn test_generate_empty_provider() {
        let generator = RuleGenerator::new(&HttpConfig::default()).unwrap();
        let mut provider = ProviderConfig::default();
        provider
            .common
            .fqdn
            .insert("cloudflare".into(), vec!["cloudflare.net".into()]);
        let rules = generator.generate(&provider).await;
        assert!(rules.cdn.is_empty());
        assert_eq!(rules.fqdn, provider.common.fqdn);
    }
}
