//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the
//! coordinator end-to-end against them, checking the content tree and the
//! persisted state shards.

use sitemap_hunter::config::Config;
use sitemap_hunter::crawler::{Coordinator, FixedSpace, Shutdown};
use sitemap_hunter::state::{DomainStatus, SuspendReason};
use sitemap_hunter::storage::StateStore;
use sitemap_hunter::url::Domain;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at `data_dir`
fn create_test_config(data_dir: &Path, max_files: u64, breaker_threshold: u32) -> Config {
    let toml = format!(
        r#"
[crawler]
pool-size = 2
min-delay-ms = 100
max-delay-ms = 200
jitter-ms = 0
request-timeout-secs = 5
robots-timeout-secs = 5
retry-ceiling = 3
breaker-threshold = {breaker_threshold}
backoff-base-ms = 10
backoff-max-ms = 20
backoff-retries = 1

[budget]
time-budget-secs = 300
max-files-per-run = {max_files}
min-free-disk-mb = 1

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
data-dir = "{data_dir}"
seed-list = "{data_dir}/seeds.txt"
"#,
        breaker_threshold = breaker_threshold,
        max_files = max_files,
        data_dir = data_dir.display(),
    );
    toml::from_str(&toml).expect("test config should parse")
}

fn coordinator(config: Config) -> Coordinator {
    Coordinator::new(config, Shutdown::never())
        .expect("coordinator should open storage")
        .with_disk_space(Box::new(FixedSpace(u64::MAX)))
}

fn count_files(data_dir: &Path, key: &str, bucket: &str) -> usize {
    std::fs::read_dir(data_dir.join("domains").join(key).join(bucket))
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0)
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .count()
}

/// Mounts robots.txt declaring an index, the index listing two children,
/// one child with rich metadata and one with bare links
async fn mount_site(server: &MockServer) {
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nAllow: /\nSitemap: {}/sitemap_index.xml\n",
            base
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .and(header_exists("If-None-Match"))
        .respond_with(ResponseTemplate::new(304))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"index-v1\"")
                .set_body_string(format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{base}/posts.xml</loc></sitemap>
  <sitemap><loc>{base}/pages.xml</loc></sitemap>
</sitemapindex>"#
                )),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/posts.xml"))
        .and(header_exists("If-None-Match"))
        .respond_with(ResponseTemplate::new(304))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/posts.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"posts-v1\"")
                .set_body_string(format!(
                    r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/p/1</loc><title>First post</title></url>
</urlset>"#
                )),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pages.xml"))
        .and(header_exists("If-None-Match"))
        .respond_with(ResponseTemplate::new(304))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pages.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"pages-v1\"")
                .set_body_string(format!(
                    r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/about</loc></url>
  <url><loc>{base}/team</loc></url>
</urlset>"#
                )),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base = mock_server.uri();

    let dir = TempDir::new().unwrap();
    let domain = Domain::parse(&base).unwrap();
    let key = domain.key().to_string();

    let mut coordinator = coordinator(create_test_config(dir.path(), 100, 10));
    let summary = coordinator.run(&[domain]).await.unwrap();

    assert_eq!(summary.domains.len(), 1);
    let report = &summary.domains[0].1;
    assert_eq!(report.status, DomainStatus::Drained);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.downloaded, 3);
    assert_eq!(report.errors, 0);

    assert_eq!(count_files(dir.path(), &key, "indices"), 1);
    assert_eq!(count_files(dir.path(), &key, "content_rich"), 1);
    assert_eq!(count_files(dir.path(), &key, "content_raw"), 1);

    let state = coordinator.store().load_domain(&key).await.unwrap();
    assert!(state.frontier.is_empty());
    assert_eq!(
        state.frontier.visited(),
        vec![
            format!("{}/pages.xml", base),
            format!("{}/posts.xml", base),
            format!("{}/sitemap_index.xml", base),
        ]
    );
    assert_eq!(state.records.len(), 3);
    assert_eq!(state.epoch, 1);

    let global = coordinator.store().load_global().await.unwrap();
    let aggregate = &global.domain_stats[&key];
    assert_eq!(aggregate.files_downloaded, 3);
    assert_eq!(aggregate.status(), Some(DomainStatus::Drained));
    assert!(aggregate.last_crawled_at.is_some());
}

#[tokio::test]
async fn test_file_quota_suspends_and_resumes() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base = mock_server.uri();

    let dir = TempDir::new().unwrap();
    let domain = Domain::parse(&base).unwrap();
    let key = domain.key().to_string();

    // First run stops after two files
    let mut first = coordinator(create_test_config(dir.path(), 2, 10));
    let summary = first.run(&[domain.clone()]).await.unwrap();

    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.stopped, Some(SuspendReason::Quota));
    assert_eq!(
        summary.domains[0].1.status,
        DomainStatus::Suspended(SuspendReason::Quota)
    );

    let state = first.store().load_domain(&key).await.unwrap();
    assert_eq!(state.frontier.queue(), vec![format!("{}/pages.xml", base)]);
    assert_eq!(state.frontier.visited_len(), 2);

    // Second run continues from the checkpoint without revisiting
    let mut second = coordinator(create_test_config(dir.path(), 100, 10));
    let summary = second.run(&[domain]).await.unwrap();

    assert_eq!(summary.domains[0].1.status, DomainStatus::Drained);
    assert_eq!(summary.domains[0].1.attempted, 1);
    assert_eq!(requests_to(&mock_server, "/sitemap_index.xml").await, 1);
    assert_eq!(requests_to(&mock_server, "/posts.xml").await, 1);
    assert_eq!(requests_to(&mock_server, "/pages.xml").await, 1);

    let state = second.store().load_domain(&key).await.unwrap();
    assert!(state.frontier.is_empty());
    assert_eq!(state.frontier.visited_len(), 3);
    assert_eq!(state.epoch, 1);
}

#[tokio::test]
async fn test_recrawl_uses_conditional_requests() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base = mock_server.uri();

    let dir = TempDir::new().unwrap();
    let domain = Domain::parse(&base).unwrap();
    let key = domain.key().to_string();

    let mut first = coordinator(create_test_config(dir.path(), 100, 10));
    first.run(&[domain.clone()]).await.unwrap();

    let index_file = dir
        .path()
        .join("domains")
        .join(&key)
        .join("indices")
        .read_dir()
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let written_at = std::fs::metadata(&index_file).unwrap().modified().unwrap();

    // The drained domain starts a new epoch and revalidates everything
    let mut second = coordinator(create_test_config(dir.path(), 100, 10));
    let summary = second.run(&[domain]).await.unwrap();
    let report = &summary.domains[0].1;

    assert_eq!(report.status, DomainStatus::Drained);
    assert_eq!(report.not_modified, 3);
    assert_eq!(report.downloaded, 0);

    let conditional = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| {
            request
                .headers
                .keys()
                .any(|name| name.as_str().eq_ignore_ascii_case("if-none-match"))
        })
        .count();
    assert_eq!(conditional, 3);

    assert_eq!(
        std::fs::metadata(&index_file).unwrap().modified().unwrap(),
        written_at,
        "unchanged documents must not be rewritten"
    );
    assert_eq!(count_files(dir.path(), &key, "content_rich"), 1);
    assert_eq!(count_files(dir.path(), &key, "content_raw"), 1);

    let state = second.store().load_domain(&key).await.unwrap();
    assert_eq!(state.epoch, 2);
    assert_eq!(state.frontier.visited_len(), 3);

    let global = second.store().load_global().await.unwrap();
    assert_eq!(global.domain_stats[&key].files_downloaded, 3);
    assert_eq!(global.domain_stats[&key].not_modified, 3);
}

#[tokio::test]
async fn test_circuit_breaker_moves_to_next_domain() {
    let broken = MockServer::start().await;
    let healthy = MockServer::start().await;
    mount_site(&healthy).await;

    let broken_base = broken.uri();
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nSitemap: {b}/a.xml\nSitemap: {b}/b.xml\n\
             Sitemap: {b}/c.xml\nSitemap: {b}/d.xml\n",
            b = broken_base
        )))
        .mount(&broken)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;

    let dir = TempDir::new().unwrap();
    let broken_domain = Domain::parse(&broken_base).unwrap();
    let healthy_domain = Domain::parse(&healthy.uri()).unwrap();

    let mut coordinator = coordinator(create_test_config(dir.path(), 100, 2));
    let summary = coordinator
        .run(&[broken_domain.clone(), healthy_domain.clone()])
        .await
        .unwrap();

    assert_eq!(summary.stopped, None);
    assert_eq!(summary.domains.len(), 2);
    assert_eq!(
        summary.domains[0].1.status,
        DomainStatus::Suspended(SuspendReason::Breaker)
    );
    assert_eq!(summary.domains[0].1.errors, 2);
    assert_eq!(summary.domains[1].1.status, DomainStatus::Drained);

    let state = coordinator
        .store()
        .load_domain(broken_domain.key())
        .await
        .unwrap();
    assert_eq!(state.frontier.queue_len(), 2);
    assert_eq!(state.errors.len(), 2);

    let global = coordinator.store().load_global().await.unwrap();
    assert_eq!(
        global.domain_stats[broken_domain.key()].last_status.as_deref(),
        Some("suspended:breaker")
    );
    assert_eq!(
        global.domain_stats[healthy_domain.key()].last_status.as_deref(),
        Some("drained")
    );
}

#[tokio::test]
async fn test_missing_robots_falls_back_to_default_sitemap() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<urlset><url><loc>{}/home</loc></url></urlset>",
            base
        )))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let domain = Domain::parse(&base).unwrap();
    let key = domain.key().to_string();

    let mut coordinator = coordinator(create_test_config(dir.path(), 100, 10));
    let summary = coordinator.run(&[domain]).await.unwrap();
    let report = &summary.domains[0].1;

    assert_eq!(report.status, DomainStatus::Drained);
    assert_eq!(report.downloaded, 1);
    // /sitemap_index.xml is requested too and answers 404
    assert_eq!(report.errors, 1);
    assert_eq!(count_files(dir.path(), &key, "content_raw"), 1);

    let state = coordinator.store().load_domain(&key).await.unwrap();
    assert_eq!(state.errors.count(&format!("{}/sitemap_index.xml", base)), 1);
}

#[tokio::test]
async fn test_fresh_reset_clears_checkpoints() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let domain = Domain::parse(&mock_server.uri()).unwrap();

    let mut first = coordinator(create_test_config(dir.path(), 1, 10));
    first.run(&[domain.clone()]).await.unwrap();
    assert_eq!(
        first.store().list_domains().await.unwrap(),
        vec![domain.key().to_string()]
    );

    let second = coordinator(create_test_config(dir.path(), 100, 10));
    assert_eq!(second.reset_all().await.unwrap(), 1);
    assert!(second.store().list_domains().await.unwrap().is_empty());

    let global = second.store().load_global().await.unwrap();
    assert!(global.last_crawled_at(domain.key()).is_some());
}

#[tokio::test]
async fn test_disk_floor_stops_run_before_first_domain() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let domain = Domain::parse(&mock_server.uri()).unwrap();

    let config = create_test_config(dir.path(), 100, 10);
    let mut coordinator = Coordinator::new(config, Shutdown::never())
        .unwrap()
        .with_disk_space(Box::new(FixedSpace(0)));
    let summary = coordinator.run(&[domain.clone()]).await.unwrap();

    assert_eq!(summary.stopped, Some(SuspendReason::Disk));
    assert!(summary.domains.is_empty());
    assert_eq!(summary.files_processed, 0);
    assert!(mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
    assert!(coordinator
        .store()
        .list_domains()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_time_budget_stops_before_next_domain() {
    let slow = MockServer::start().await;
    let untouched = MockServer::start().await;
    mount_site(&untouched).await;

    let slow_base = slow.uri();
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("User-agent: *\nSitemap: {}/slow.xml\n", slow_base)),
        )
        .mount(&slow)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(1200))
                .set_body_string(format!("<urlset><url><loc>{}/a</loc></url></urlset>", slow_base)),
        )
        .mount(&slow)
        .await;

    let dir = TempDir::new().unwrap();
    let slow_domain = Domain::parse(&slow_base).unwrap();
    let untouched_domain = Domain::parse(&untouched.uri()).unwrap();

    let mut config = create_test_config(dir.path(), 100, 10);
    config.budget.time_budget_secs = 1;
    let mut coordinator = coordinator(config);
    let summary = coordinator
        .run(&[slow_domain.clone(), untouched_domain.clone()])
        .await
        .unwrap();

    assert_eq!(summary.stopped, Some(SuspendReason::Time));
    assert_eq!(summary.domains.len(), 1);
    assert_eq!(summary.domains[0].0, slow_domain.key());
    assert_eq!(summary.domains[0].1.status, DomainStatus::Drained);
    assert!(untouched
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());

    let global = coordinator.store().load_global().await.unwrap();
    assert!(global.last_crawled_at(slow_domain.key()).is_some());
    assert!(global.last_crawled_at(untouched_domain.key()).is_none());
}
