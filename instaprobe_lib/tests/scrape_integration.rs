use std::sync::Arc;

use instaprobe_lib::{
    ConnectionStatus, Confidence, ErrorKind, ExtractionPipeline, PostType, ProfileScraper,
    ProxyPool, ScraperConfig,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn scraper_for(server: &MockServer) -> ProfileScraper {
    let config = ScraperConfig::for_base_url(&server.uri());
    let pool = Arc::new(ProxyPool::new(&config));
    ProfileScraper::with_components(config, pool, ExtractionPipeline::default()).unwrap()
}

async fn mount_page(server: &MockServer, username: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/", username)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn embedded_json_scrape_on_behalf_of_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instagram/"))
        .and(header("user-agent", "TestAgent/1.0"))
        .and(header("x-forwarded-for", "1.2.3.4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("profile_page.html")))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let result = scraper
        .scrape("instagram", Some("1.2.3.4"), Some("TestAgent/1.0"))
        .await
        .unwrap();

    assert_eq!(result.profile.statistics.followers, 500_000_000);
    assert_eq!(result.profile.statistics.following, 76);
    assert_eq!(result.profile.statistics.posts, 7_800);
    assert_eq!(result.profile.identity.full_name, "Instagram");
    assert!(result.profile.identity.is_verified);
    assert_eq!(result.profile.identity.profile_pic_url, "https://cdn.example/hd.jpg");
    assert_eq!(result.used_ip, "1.2.3.4");
    assert!(!result.cached);
    assert_eq!(result.strategy, "embedded_json");
    assert_eq!(result.confidence, Confidence::High);
    assert!(result.data_points > 0);

    assert_eq!(result.posts.total, 2);
    assert_eq!(result.posts.recent[0].caption, "Hello world");
    assert_eq!(result.posts.recent[1].post_type, PostType::Video);
    assert_eq!(result.posts.recent[1].url, "https://instagram.com/p/CxBBB");

    let entry = scraper.pool().user_ips().get("1.2.3.4").unwrap();
    assert_eq!(entry.user_agent.as_deref(), Some("TestAgent/1.0"));
    assert_eq!(entry.stats.success_count, 1);
}

#[tokio::test]
async fn repeat_scrape_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instagram/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("profile_page.html")))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let first = scraper
        .scrape("instagram", Some("1.2.3.4"), Some("TestAgent/1.0"))
        .await
        .unwrap();
    let second = scraper
        .scrape("@instagram", Some("1.2.3.4"), Some("TestAgent/1.0"))
        .await
        .unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.profile, second.profile);
    assert_eq!(first.posts, second.posts);
    assert_eq!(scraper.requests_sent(), 1);

    let entry = scraper.pool().user_ips().get("1.2.3.4").unwrap();
    assert_eq!(entry.stats.success_count + entry.stats.failure_count, 1);
}

#[tokio::test]
async fn direct_scrape_without_client_ip() {
    let server = MockServer::start().await;
    mount_page(&server, "instagram", 200, load_fixture("profile_page.html")).await;

    let scraper = scraper_for(&server);
    let result = scraper.scrape("instagram", None, None).await.unwrap();

    assert_eq!(result.used_ip, "direct");
    assert!(scraper.pool().user_ips().is_empty());
}

#[tokio::test]
async fn private_profile_stops_pipeline() {
    let server = MockServer::start().await;
    mount_page(&server, "someone", 200, load_fixture("private_page.html")).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let err = scraper
        .scrape("someone", Some("1.2.3.4"), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::PrivateProfile);
    assert_eq!(err.used_ip.as_deref(), Some("1.2.3.4"));
}

#[tokio::test]
async fn missing_profile_is_not_found() {
    let server = MockServer::start().await;
    mount_page(&server, "ghost", 200, load_fixture("not_found_page.html")).await;

    let scraper = scraper_for(&server);
    let err = scraper.scrape("ghost", None, None).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::ProfileNotFound);
    assert_eq!(err.used_ip.as_deref(), Some("direct"));
}

#[tokio::test]
async fn falls_back_to_web_profile_api() {
    let server = MockServer::start().await;
    mount_page(&server, "instagram", 200, "<html><body>Log in</body></html>".into()).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .and(query_param("username", "instagram"))
        .and(header("x-ig-app-id", "936619743392459"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("web_profile_info.json")))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let result = scraper.scrape("instagram", None, None).await.unwrap();

    assert_eq!(result.strategy, "web_profile_api");
    assert_eq!(result.profile.statistics.followers, 672_000_000);
    assert_eq!(result.confidence, Confidence::High);
}

#[tokio::test]
async fn falls_back_to_html_heuristic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/nasa/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("meta_only_page.html")))
        // The heuristic reuses the cached page.
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let result = scraper.scrape("nasa", None, None).await.unwrap();

    assert_eq!(result.strategy, "html_heuristic");
    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(result.profile.identity.username, "nasa");
    assert_eq!(result.profile.identity.full_name, "NASA (@nasa)");
    assert_eq!(result.profile.statistics.followers, 97_100_000);
    assert_eq!(result.profile.statistics.posts, 4_300);
    assert_eq!(result.posts.total, 0);
}

#[tokio::test]
async fn all_strategies_failing_is_scraping_failed() {
    let server = MockServer::start().await;
    mount_page(&server, "instagram", 500, "oops".into()).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let err = scraper
        .scrape("instagram", Some("1.2.3.4"), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ScrapingFailed);
    assert_eq!(err.cause, Some(ErrorKind::RequestFailed));
    assert!(err.message.contains("html_heuristic"));
    assert_eq!(err.used_ip.as_deref(), Some("1.2.3.4"));

    let entry = scraper.pool().user_ips().get("1.2.3.4").unwrap();
    assert_eq!(entry.stats.failure_count, 3);
}

#[tokio::test]
async fn invalid_username_makes_no_request() {
    let server = MockServer::start().await;
    let scraper = scraper_for(&server);

    let err = scraper.scrape("../admin", None, None).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidUsername);
    assert!(err.used_ip.is_none());
    assert_eq!(scraper.requests_sent(), 0);
}

#[tokio::test]
async fn stories_need_authentication() {
    let server = MockServer::start().await;
    let scraper = scraper_for(&server);

    let err = scraper.stories("instagram").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthenticationRequired);
}

#[tokio::test]
async fn connection_test_operational() {
    let server = MockServer::start().await;
    mount_page(&server, "instagram", 200, load_fixture("profile_page.html")).await;

    let scraper = scraper_for(&server);
    let report = scraper.test_connection(Some("1.2.3.4")).await;

    assert_eq!(report.status, ConnectionStatus::Operational);
    assert_eq!(report.used_ip.as_deref(), Some("1.2.3.4"));
    assert!(report.data_points.unwrap() > 0);
    assert!(report.message.is_none());
}

#[tokio::test]
async fn connection_test_degraded_when_site_errors() {
    let server = MockServer::start().await;
    mount_page(&server, "instagram", 503, "maintenance".into()).await;

    let scraper = scraper_for(&server);
    let report = scraper.test_connection(None).await;

    assert_eq!(report.status, ConnectionStatus::Degraded);
    assert!(report.message.unwrap().contains("SCRAPING_FAILED"));
}

#[tokio::test]
async fn connection_test_offline_when_unreachable() {
    let config = ScraperConfig::for_base_url("http://127.0.0.1:1");
    let pool = Arc::new(ProxyPool::new(&config));
    let scraper =
        ProfileScraper::with_components(config, pool, ExtractionPipeline::default()).unwrap();

    let report = scraper.test_connection(None).await;

    assert_eq!(report.status, ConnectionStatus::Offline);
    assert_eq!(report.used_ip.as_deref(), Some("direct"));
}

#[tokio::test]
async fn clear_cache_forces_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instagram/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("profile_page.html")))
        .expect(2)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    scraper.scrape("instagram", None, None).await.unwrap();
    scraper.clear_cache();
    let again = scraper.scrape("instagram", None, None).await.unwrap();

    assert!(!again.cached);
    assert_eq!(scraper.requests_sent(), 2);
}
