//! Provider configuration for the CDN/WAF/Cloud rule generator.
//!
//! ```yaml
//! cdn:
//!   asn:
//!     cloudflare: [AS13335, AS209242]
//!   urls:
//!     cloudflare: [https://www.cloudflare.com/ips-v4]
//! waf: { ... }
//! cloud: { ... }
//! common:
//!   fqdn:
//!     cloudflare: [cloudflare.net]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

/// Provider name -> list of values
pub type ProviderMap = BTreeMap<String, Vec<String>>;

/// ASN and URL sources of one category
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    #[serde(deserialize_with = "asn_map")]
    pub asn: ProviderMap,
    pub urls: ProviderMap,
}

impl ProviderSection {
    pub fn is_empty(&self) -> bool {
        self.asn.values().all(Vec::is_empty) && self.urls.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommonSection {
    pub fqdn: ProviderMap,
}

/// Top-level provider document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub cdn: ProviderSection,
    pub waf: ProviderSection,
    pub cloud: ProviderSection,
    pub common: CommonSection,
}

impl ProviderConfig {
    /// Load provider configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read provider file: {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse provider file: {:?}", path.as_ref()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Categories in output order
    pub fn sections(&self) -> [(&'static str, &ProviderSection); 3] {
        [("cdn", &self.cdn), ("waf", &self.waf), ("cloud", &self.cloud)]
    }
}

/// ASNs may be written as `AS13335` or bare `13335`; both become `AS13335`.
fn asn_map<'de, D>(deserializer: D) -> Result<ProviderMap, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Asn {
        Number(u32),
        Text(String),
    }

    let raw: Option<BTreeMap<String, Vec<Asn>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(provider, asns)| {
            let asns = asns
                .into_iter()
                .map(|asn| match asn {
                    Asn::Number(n) => format!("AS{}", n),
                    Asn::Text(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                        format!("AS{}", s)
                    }
                    Asn::Text(s) => s,
                })
                .collect();
            (provider, asns)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
cdn:
  asn:
    cloudflare:
      - AS13335
      - 209242
    akamai: ["20940"]
  urls:
    cloudflare:
      - https://www.cloudflare.com/ips-v4
waf:
  urls:
    imperva:
      - https://my.imperva.com/api/integration/v1/ips
cloud:
  asn:
    aws: []
common:
  fqdn:
    cloudflare:
      - cloudflare.net
    akamai:
      - akamaiedge.net
      - akamai.net
unused:
  key: value
"#;

    #[test]
    fn test_parse_sample() {
        let config = ProviderConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.cdn.asn["cloudflare"], vec!["AS13335", "AS209242"]);
        assert_eq!(config.cdn.asn["akamai"], vec!["AS20940"]);
        assert_eq!(config.cdn.urls["cloudflare"].len(), 1);
        assert!(config.waf.asn.is_empty());
        assert_eq!(config.waf.urls["imperva"].len(), 1);
        assert!(config.cloud.is_empty());
        assert_eq!(config.common.fqdn["akamai"], vec!["akamaiedge.net", "akamai.net"]);
    }

    #[test]
    fn test_missing_sections_default() {
        let config = ProviderConfig::from_yaml("cdn:\n  urls: {}\n").unwrap();
        assert!(config.cdn.is_empty());
        assert!(config.waf.is_empty());
        assert!(config.common.fqdn.is_empty());
    }

    #[test]
    fn test_null_asn_map() {
        let config = ProviderConfig::from_yaml("cdn:\n  asn:\n").unwrap();
        assert!(config.cdn.asn.is_empty());
    }

    #[test]
    fn test_sections_order() {
        let config = ProviderConfig::default();
        let names: Vec<_> = config.sections().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["cdn", "waf", "cloud"]);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(ProviderConfig::from_yaml("cdn: [unclosed").is_err());
        assert!(ProviderConfig::from_yaml("cdn:\n  urls:\n    x: 5\n").is_err());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = ProviderConfig::load(file.path()).unwrap();
        assert_eq!(config.common.fqdn.len(), 2);
        assert!(ProviderConfig::load("/nonexistent/provider.yaml").is_err());
    }
}
