//! Mining pool collection across sources with per-source isolation.

use netfeeds::aggregator::{PoolFinder, POOL_STATS_SOURCE};
use netfeeds::config::{EmptyOutput, PoolFinderConfig, PoolStatsConfig, SourceDescriptor};
use netfeeds::extract::SourceFormat;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TXT_FEED: &str = "# Crypto mining pools\n\npool.minexmr.com\n  xmr.nanopool.org  \n# comment\npool.minexmr.com\n";

const SIGMA_RULE: &str = r#"
title: Cryptocurrency Mining Pool DNS
logsource:
  category: dns
detection:
  selection:
    query|endswith:
      - .nanopool.org
      - xmr.nanopool.org
  condition: selection
"#;

async fn mount_body(server: &MockServer, at: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn url(server: &MockServer, at: &str) -> String {
    format!("{}{}", server.uri(), at)
}

fn disabled_stats() -> PoolStatsConfig {
    PoolStatsConfig {
        enabled: false,
        ..PoolStatsConfig::default()
    }
}

fn config_with(sources: Vec<SourceDescriptor>, pool_stats: PoolStatsConfig) -> PoolFinderConfig {
    PoolFinderConfig {
        sources,
        pool_stats,
        ..PoolFinderConfig::default()
    }
}

#[tokio::test]
async fn test_merges_text_and_sigma_sources() {
    let server = MockServer::start().await;
    mount_body(&server, "/crypto_mining.txt", 200, TXT_FEED).await;
    mount_body(&server, "/rule.yml", 200, SIGMA_RULE).await;

    let config = config_with(
        vec![
            SourceDescriptor::new(SourceFormat::PlainText, &[&url(&server, "/crypto_mining.txt")]),
            SourceDescriptor::new(SourceFormat::Sigma, &[&url(&server, "/rule.yml")]),
        ],
        disabled_stats(),
    );

    let mut finder = PoolFinder::new(config).unwrap();
    let summary = finder.run().await.unwrap();

    assert_eq!(summary.succeeded(), 2);
    assert_eq!(
        finder.identifiers(),
        vec![".nanopool.org", "pool.minexmr.com", "xmr.nanopool.org"]
    );
    assert_eq!(finder.len(), 3);
}

#[tokio::test]
async fn test_failing_source_does_not_block_others() {
    let server = MockServer::start().await;
    mount_body(&server, "/missing.txt", 404, "").await;
    mount_body(&server, "/broken.yml", 200, "detection: [unclosed").await;
    mount_body(&server, "/good.txt", 200, "good.pool.net\n").await;

    let config = config_with(
        vec![
            SourceDescriptor::new(SourceFormat::PlainText, &[&url(&server, "/missing.txt")]),
            SourceDescriptor::new(SourceFormat::Sigma, &[&url(&server, "/broken.yml")]),
            SourceDescriptor::new(SourceFormat::PlainText, &[&url(&server, "/good.txt")]),
        ],
        disabled_stats(),
    );

    let mut finder = PoolFinder::new(config).unwrap();
    let summary = finder.run().await.unwrap();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.failures().count(), 2);
    assert_eq!(finder.identifiers(), vec!["good.pool.net"]);
}

#[tokio::test]
async fn test_same_source_twice_is_idempotent() {
    let server = MockServer::start().await;
    mount_body(&server, "/list.txt", 200, TXT_FEED).await;
    let feed = url(&server, "/list.txt");

    let mut once = PoolFinder::new(config_with(
        vec![SourceDescriptor::new(SourceFormat::PlainText, &[&feed])],
        disabled_stats(),
    ))
    .unwrap();
    once.run().await.unwrap();

    let mut twice = PoolFinder::new(config_with(
        vec![SourceDescriptor::new(SourceFormat::PlainText, &[&feed, &feed])],
        disabled_stats(),
    ))
    .unwrap();
    twice.run().await.unwrap();

    assert_eq!(once.identifiers(), twice.identifiers());
}

#[tokio::test]
async fn test_all_sources_failing_is_an_error() {
    let server = MockServer::start().await;
    mount_body(&server, "/a.txt", 500, "").await;

    let config = config_with(
        vec![SourceDescriptor::new(SourceFormat::PlainText, &[&url(&server, "/a.txt")])],
        disabled_stats(),
    );

    let mut finder = PoolFinder::new(config).unwrap();
    assert!(finder.run().await.is_err());
}

#[tokio::test]
async fn test_pool_stats_merged_with_feeds() {
    let server = MockServer::start().await;
    mount_body(&server, "/list.txt", 200, "xmr.nanopool.org\n").await;
    mount_body(&server, "/data/time", 200, "99").await;
    Mock::given(method("GET"))
        .and(path("/data/coins_data.js"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "page": "monero" }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/monero.js"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "url": "https://xmr.nanopool.org/" },
                { "url": "https://supportxmr.com/" }
            ]
        })))
        .mount(&server)
        .await;

    let config = config_with(
        vec![SourceDescriptor::new(SourceFormat::PlainText, &[&url(&server, "/list.txt")])],
        PoolStatsConfig {
            enabled: true,
            data_url: url(&server, "/data"),
            site_url: "https://miningpoolstats.stream".to_string(),
            refresh_every: 30,
        },
    );

    let mut finder = PoolFinder::new(config).unwrap();
    let summary = finder.run().await.unwrap();

    assert!(summary
        .outcomes
        .iter()
        .any(|o| o.name == POOL_STATS_SOURCE && o.result == Ok(2)));
    assert_eq!(finder.identifiers(), vec!["supportxmr.com", "xmr.nanopool.org"]);
}

#[tokio::test]
async fn test_walk_failure_fatal_by_default() {
    let server = MockServer::start().await;
    mount_body(&server, "/list.txt", 200, "a.pool\n").await;
    mount_body(&server, "/data/time", 502, "").await;

    let stats = PoolStatsConfig {
        enabled: true,
        data_url: url(&server, "/data"),
        ..PoolStatsConfig::default()
    };
    let sources = vec![SourceDescriptor::new(SourceFormat::PlainText, &[&url(&server, "/list.txt")])];

    let mut finder = PoolFinder::new(config_with(sources.clone(), stats.clone())).unwrap();
    assert!(finder.run().await.is_err());

    let mut config = config_with(sources, stats);
    config.walk_failure_fatal = false;
    let mut finder = PoolFinder::new(config).unwrap();
    let summary = finder.run().await.unwrap();
    assert_eq!(summary.failures().count(), 1);
    assert_eq!(finder.identifiers(), vec!["a.pool"]);
}

#[tokio::test]
async fn test_write_json_counts_and_empty_policy() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_body(&server, "/list.txt", 200, "a.pool\nb.pool\na.pool\n").await;
    mount_body(&server, "/empty.txt", 200, "# nothing here\n").await;

    let out = dir.path().join("pools.json");
    let mut finder = PoolFinder::new(config_with(
        vec![SourceDescriptor::new(SourceFormat::PlainText, &[&url(&server, "/list.txt")])],
        disabled_stats(),
    ))
    .unwrap();
    finder.run().await.unwrap();
    assert_eq!(finder.write_json(&out).unwrap(), 2);
    let written: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written.len(), 2);

    let empty_out = dir.path().join("empty.json");
    let empty_sources =
        vec![SourceDescriptor::new(SourceFormat::PlainText, &[&url(&server, "/empty.txt")])];
    let mut finder = PoolFinder::new(config_with(empty_sources.clone(), disabled_stats())).unwrap();
    finder.run().await.unwrap();
    assert_eq!(finder.write_json(&empty_out).unwrap(), 0);
    assert!(!empty_out.exists());

    let mut config = config_with(empty_sources, disabled_stats());
    config.empty_output = EmptyOutput::WriteEmpty;
    let mut finder = PoolFinder::new(config).unwrap();
    finder.run().await.unwrap();
    assert_eq!(finder.write_json(&empty_out).unwrap(), 0);
    assert_eq!(std::fs::read_to_string(&empty_out).unwrap(), "[]");
}
