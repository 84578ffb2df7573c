//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small three-level listing site and
//! run the full crawl cycle end-to-end over HTTP with file checkpoints.

use listing_harvester::checkpoint::{open_store, FileCheckpointStore};
use listing_harvester::config::{parse_config, Config};
use listing_harvester::crawler::{CrawlEngine, Fault};
use listing_harvester::record::{NO_AGENT_INFO, NO_DESCRIPTION};
use listing_harvester::session::HttpSessionFactory;
use listing_harvester::{CheckpointStore, HarvestError};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    let toml = format!(
        r#"
[crawler]
entry-url = "{base_url}/catalog"
checkpoint-every = 5
settle-delay-ms = 0
poll-interval-ms = 10

[timeouts]
catalog-secs = 1
group-secs = 1
detail-secs = 1

[session-retry]
backoff-ms = 0

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
state-path = "{state}"
records-path = "{records}"
"#,
        base_url = base_url,
        state = dir.path().join("last_state.txt").display(),
        records = dir.path().join("listings.csv").display(),
    );
    parse_config(&toml).expect("test config should be valid")
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_catalog(server: &MockServer, communities: usize) {
    let links: String = (0..communities)
        .map(|i| format!(r#"<a href="/community/{}">Community {}</a>"#, i, i))
        .collect();
    mount_html(
        server,
        "/catalog",
        format!(
            r#"<html><body><div class="commlst clearfix">{}</div></body></html>"#,
            links
        ),
    )
    .await;
}

async fn mount_community(server: &MockServer, index: usize, listings: &[&str]) {
    let links: String = listings
        .iter()
        .map(|id| format!(r#"<a class="view_details_url" href="/listing/{}">View</a>"#, id))
        .collect();
    mount_html(
        server,
        &format!("/community/{}", index),
        format!(
            r#"<html><body><div class="result_box">{}</div></body></html>"#,
            links
        ),
    )
    .await;
}

async fn mount_listing(server: &MockServer, id: &str, extra: &str) {
    mount_html(
        server,
        &format!("/listing/{}", id),
        format!(
            r#"<html><body>
            <div class="price_div">$525,000</div>
            <a itemprop="name" href="/map">{id} Gulf Shore Blvd</a>
            <div class="info_div">3 Beds 2 Baths 1,850 ft²</div>
            <div class="features_column">Pool</div>
            <div class="features_column">Lanai</div>
            {extra}
            </body></html>"#,
            id = id,
            extra = extra
        ),
    )
    .await;
}

/// Two communities; one listing answers with a server error
async fn mount_site(server: &MockServer) {
    mount_catalog(server, 2).await;
    mount_community(server, 0, &["a", "b"]).await;
    mount_community(server, 1, &["c", "broken", "d"]).await;

    mount_listing(server, "a", r#"<p class="txtblk">Bay views</p>"#).await;
    mount_listing(server, "b", r#"<span id="agent_name">Jordan Lee</span>"#).await;
    mount_listing(server, "c", "").await;
    mount_listing(server, "d", "").await;

    Mock::given(method("GET"))
        .and(path("/listing/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

fn engine(config: &Config) -> CrawlEngine<HttpSessionFactory, FileCheckpointStore> {
    CrawlEngine::new(
        config,
        HttpSessionFactory::from_config(config),
        open_store(&config.output),
    )
}

#[tokio::test]
async fn test_full_harvest_writes_checkpoint() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir);

    let mut engine = engine(&config);
    let stats = engine.run().await.expect("harvest should succeed");

    assert_eq!(stats.nodes_total, 2);
    assert_eq!(stats.nodes_visited, 2);
    assert_eq!(stats.records_extracted, 4);
    assert_eq!(stats.extraction_faults, 1);
    assert_eq!(stats.flushes, 2);

    let store = engine.store();
    assert_eq!(fs::read_to_string(store.index_path()).unwrap(), "2");

    let records = store.read_snapshot().unwrap();
    let links: Vec<_> = records.iter().map(|r| r.link.clone()).collect();
    let base = mock_server.uri();
    assert_eq!(
        links,
        vec![
            format!("{}/listing/a", base),
            format!("{}/listing/b", base),
            format!("{}/listing/c", base),
            format!("{}/listing/d", base),
        ]
    );

    let first = &records[0];
    assert_eq!(first.price, "$525,000");
    assert_eq!(first.address, "a Gulf Shore Blvd");
    assert_eq!((first.beds, first.baths, first.sqft), (3, 2, 1850));
    assert_eq!(first.description, "Bay views");
    assert_eq!(first.agent_info, NO_AGENT_INFO);
    assert_eq!(first.features, vec!["Pool", "Lanai"]);
    assert_eq!(first.additional_info, "Pool\nLanai");

    assert_eq!(records[1].description, NO_DESCRIPTION);
    assert_eq!(records[1].agent_info, "Jordan Lee");
}

#[tokio::test]
async fn test_resume_skips_flushed_nodes() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 2).await;
    mount_community(&mock_server, 1, &["c"]).await;
    mount_listing(&mock_server, "c", "").await;

    Mock::given(method("GET"))
        .and(path("/community/0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir);
    fs::write(&config.output.state_path, "1").unwrap();

    let mut engine = engine(&config);
    let stats = engine.run().await.expect("harvest should succeed");

    assert_eq!(stats.resume_index, 1);
    assert_eq!(stats.nodes_visited, 1);

    // Only the records of this run are in the snapshot
    let state = engine.store().read_state().unwrap();
    assert_eq!(state.last_completed_index, 2);
    assert_eq!(state.records.len(), 1);
    assert!(state.records[0].link.ends_with("/listing/c"));
}

#[tokio::test]
async fn test_failed_community_does_not_affect_later_ones() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, 3).await;
    mount_community(&mock_server, 0, &["a"]).await;
    mount_community(&mock_server, 2, &["c", "d"]).await;
    for id in ["a", "c", "d"] {
        mount_listing(&mock_server, id, "").await;
    }

    Mock::given(method("GET"))
        .and(path("/community/1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir);

    let mut engine = engine(&config);
    let stats = engine.run().await.expect("harvest should succeed");

    assert_eq!(stats.nodes_failed, 1);
    assert_eq!(stats.nodes_visited, 2);
    assert_eq!(stats.records_extracted, 3);
    assert_eq!(stats.flushes, 2);

    let state = engine.store().read_state().unwrap();
    assert_eq!(state.last_completed_index, 3);
    let links: Vec<_> = state.records.iter().map(|r| r.link.clone()).collect();
    let base = mock_server.uri();
    assert_eq!(
        links,
        vec![
            format!("{}/listing/a", base),
            format!("{}/listing/c", base),
            format!("{}/listing/d", base),
        ]
    );
}

#[tokio::test]
async fn test_missing_catalog_fails_without_checkpoint() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/catalog",
        "<html><body><p>Maintenance</p></body></html>".to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir);

    let mut engine = engine(&config);
    let result = engine.run().await;

    assert!(matches!(
        result,
        Err(HarvestError::Fault(Fault::Discovery { .. }))
    ));
    assert!(!engine.store().index_path().exists());
    assert!(!engine.store().records_path().exists());
    assert_eq!(engine.store().load_resume_index().unwrap(), 0);
}
