use instaprobe_lib::proxy::{
    HtmlListingSource, PlainListSource, ProxySource, Protocol, ProxyPool,
};
use instaprobe_lib::ScraperConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn plain(server: &MockServer, name: &str, route: &str) -> Box<dyn ProxySource> {
    Box::new(PlainListSource::new(
        name,
        &format!("{}{}", server.uri(), route),
        Protocol::Http,
    ))
}

#[tokio::test]
async fn failing_source_leaves_pool_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = ScraperConfig::default();
    let pool = ProxyPool::with_sources(&config, vec![plain(&server, "down", "/down.txt")]);
    pool.add_proxy("10.0.0.1:8080".parse().unwrap(), Protocol::Http);

    let added = pool.refresh_proxy_pool().await;

    assert_eq!(added, 0);
    assert_eq!(pool.len(), 1);
    assert!(pool.get("10.0.0.1:8080").is_some());
}

#[tokio::test]
async fn refresh_merges_unique_addresses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("10.0.0.1:8080\n10.0.0.2:3128\n10.0.0.2:3128\ngarbage\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<table><tr><td>10.0.0.2</td><td>3128</td></tr><tr><td>10.0.0.3</td><td>80</td></tr></table>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = ScraperConfig::default();
    let sources: Vec<Box<dyn ProxySource>> = vec![
        plain(&server, "a", "/a.txt"),
        plain(&server, "down", "/down.txt"),
        Box::new(HtmlListingSource::new(
            "b",
            &format!("{}/b.html", server.uri()),
            Protocol::Http,
        )),
    ];
    let pool = ProxyPool::with_sources(&config, sources);
    pool.add_proxy("10.0.0.1:8080".parse().unwrap(), Protocol::Http);

    let added = pool.refresh_proxy_pool().await;

    assert_eq!(added, 2);
    assert_eq!(pool.len(), 3);
    assert!(pool.get("10.0.0.3:80").is_some());

    // A second pass finds nothing new.
    assert_eq!(pool.refresh_proxy_pool().await, 0);
    assert!(pool.get_stats().last_refresh_at.is_some());
}

#[tokio::test]
async fn concurrent_refreshes_do_not_double_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("10.0.0.1:8080\n10.0.0.2:8080\n"))
        .mount(&server)
        .await;

    let config = ScraperConfig::default();
    let pool = ProxyPool::with_sources(&config, vec![plain(&server, "a", "/a.txt")]);

    let (first, second) = tokio::join!(pool.refresh_proxy_pool(), pool.refresh_proxy_pool());

    assert_eq!(first + second, 2);
    assert_eq!(pool.len(), 2);
}
