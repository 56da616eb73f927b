//! Identifier extraction from downloaded content.
//!
//! Every extractor takes the raw body of one source and returns candidate
//! identifiers (hostnames or CIDR strings) in the order they were found.
//! Deduplication happens where results are merged.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::FetchError;

/// Loose IPv4 CIDR pattern. Octets and prefix length are not range-checked,
/// so `999.999.999.999/999` matches too.
static CIDR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}/[0-9]{1,3}")
        .expect("CIDR pattern is valid")
});

/// Anchor marker of the Azure service tags download link
pub const SERVICE_TAGS_MARKER: &str = "ServiceTags_Public_";

/// Declared format of a static source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFormat {
    /// One identifier per line, `#` comments
    #[serde(rename = "txt")]
    PlainText,
    /// Sigma detection rule
    #[serde(rename = "sigma")]
    Sigma,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::PlainText => f.write_str("txt"),
            SourceFormat::Sigma => f.write_str("sigma"),
        }
    }
}

/// Extract identifiers from a body according to its declared format
pub fn extract(format: SourceFormat, content: &str) -> Result<Vec<String>, FetchError> {
    match format {
        SourceFormat::PlainText => Ok(parse_plain_list(content)),
        SourceFormat::Sigma => parse_sigma_rule(content),
    }
}

/// Parse a plain list: one entry per line, blank lines and `#` comments skipped
pub fn parse_plain_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct SigmaRule {
    #[serde(default)]
    detection: Detection,
}

#[derive(Debug, Default, Deserialize)]
struct Detection {
    #[serde(default)]
    selection: Selection,
}

#[derive(Debug, Default, Deserialize)]
struct Selection {
    #[serde(rename = "DestinationHostname", default, deserialize_with = "one_or_many")]
    destination_hostname: Vec<String>,
    #[serde(rename = "query|contains", default, deserialize_with = "one_or_many")]
    query_contains: Vec<String>,
    #[serde(rename = "query|endswith", default, deserialize_with = "one_or_many")]
    query_endswith: Vec<String>,
}

/// Sigma allows a single value wherever a list is expected
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
        None => Vec::new(),
    })
}

/// Parse a Sigma rule and collect the hostnames of `detection.selection`.
///
/// Reads `DestinationHostname`, `query|contains` and `query|endswith`.
/// Missing fields contribute nothing. Only the first YAML document of a
/// multi-document file is read.
pub fn parse_sigma_rule(content: &str) -> Result<Vec<String>, FetchError> {
    let Some(document) = serde_yaml::Deserializer::from_str(content).next() else {
        return Ok(Vec::new());
    };
    let rule = SigmaRule::deserialize(document)?;
    let selection = rule.detection.selection;

    Ok(selection
        .destination_hostname
        .into_iter()
        .chain(selection.query_contains)
        .chain(selection.query_endswith)
        .collect())
}

/// Find every CIDR-looking substring in raw text
pub fn find_cidrs(text: &str) -> Vec<String> {
    CIDR_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// First anchor `href` in an HTML page containing `marker`
pub fn find_link(html: &str, marker: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains(marker))
        .map(str::to_string)
}
