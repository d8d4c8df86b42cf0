//! HTTP client for the site's public profile pages and web profile endpoint.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::{types::RawResponse, user_agent::get_user_agent, Error};

/// Production site root.
pub const DEFAULT_BASE_URL: &str = "https://www.instagram.com";

/// Application id the web client sends with API calls.
pub const WEB_APP_ID: &str = "936619743392459";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Which header set a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestKind {
    /// Top-level HTML navigation.
    #[default]
    Page,
    /// XHR-style JSON call.
    Api,
}

/// Per-request routing and identity options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions<'a> {
    pub kind: RequestKind,
    /// Falls back to a random browser user agent when `None` or not a valid header value.
    pub user_agent: Option<&'a str>,
    /// Full proxy URL (`http://host:port`, `socks5://host:port`). `None` sends over the shared session.
    pub proxy_url: Option<&'a str>,
    /// Emitted as `X-Forwarded-For` and `X-Real-IP`. This only annotates the request; the
    /// socket still originates from this host.
    pub forwarded_for: Option<&'a str>,
}

/// HTTP client that impersonates a desktop browser.
///
/// Direct requests share one long-lived `reqwest::Client` (connection pool and
/// cookie jar). Proxied requests build a one-off client bound to that proxy,
/// since `reqwest` fixes proxies at client construction.
pub struct Client {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl Client {
    /// Creates a client pointing at the production site.
    pub fn new() -> Result<Self, Error> {
        Self::with_options(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::with_options(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL and per-request timeout.
    pub fn with_options(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let http = build_http(timeout, None)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `{base}/{username}/`
    pub fn profile_url(&self, username: &str) -> Result<Url, Error> {
        Url::parse(&format!("{}/{}/", self.base_url, username)).map_err(|e| {
            tracing::error!("Invalid profile URL for {}: {}", username, e);
            Error::InvalidUrl(e.to_string())
        })
    }

    /// `{base}/api/v1/users/web_profile_info/?username={username}`
    pub fn web_profile_info_url(&self, username: &str) -> Result<Url, Error> {
        let mut url = Url::parse(&format!(
            "{}/api/v1/users/web_profile_info/",
            self.base_url
        ))
        .map_err(|e| {
            tracing::error!("Invalid API URL: {}", e);
            Error::InvalidUrl(e.to_string())
        })?;
        url.query_pairs_mut().append_pair("username", username);
        Ok(url)
    }

    /// Sends a GET and returns whatever the server answered, including non-200 statuses.
    pub async fn get(&self, url: &Url, options: &RequestOptions<'_>) -> Result<RawResponse, Error> {
        let proxied;
        let http = match options.proxy_url {
            Some(proxy_url) => {
                let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                    tracing::warn!("Rejected proxy {}: {}", proxy_url, e);
                    Error::InvalidProxy(proxy_url.to_string())
                })?;
                proxied = build_http(self.timeout, Some(proxy))?;
                &proxied
            }
            None => &self.http,
        };

        let resp = http
            .get(url.clone())
            .headers(request_headers(options))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to get {}: {}", url, e);
                Error::from_reqwest(e)
            })?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(|e| {
            tracing::warn!("Failed to read response body from {}: {}", url, e);
            Error::from_reqwest(e)
        })?;

        Ok(RawResponse {
            status,
            url: final_url,
            body,
        })
    }
}

fn build_http(timeout: Duration, proxy: Option<reqwest::Proxy>) -> Result<reqwest::Client, Error> {
    // Environment proxies are ignored; routing is decided by the caller.
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .cookie_store(true)
        .no_proxy();
    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(|e| {
        tracing::error!("Failed to build HTTP client: {}", e);
        Error::RequestFailed(e.to_string())
    })
}

fn request_headers(options: &RequestOptions<'_>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let user_agent = options
        .user_agent
        .and_then(|ua| HeaderValue::from_str(ua).ok())
        .unwrap_or_else(|| HeaderValue::from_static(get_user_agent()));
    headers.insert(reqwest::header::USER_AGENT, user_agent);

    let fixed: &[(&str, &str)] = match options.kind {
        RequestKind::Page => &[
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
            ("accept-language", "en-US,en;q=0.9"),
            ("dnt", "1"),
            ("upgrade-insecure-requests", "1"),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-user", "?1"),
            ("cache-control", "max-age=0"),
        ],
        RequestKind::Api => &[
            ("accept", "application/json"),
            ("accept-language", "en-US,en;q=0.9"),
            ("x-ig-app-id", WEB_APP_ID),
            ("x-requested-with", "XMLHttpRequest"),
            ("sec-fetch-dest", "empty"),
            ("sec-fetch-mode", "cors"),
            ("sec-fetch-site", "same-origin"),
        ],
    };
    for (name, value) in fixed {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    if let Some(ip) = options
        .forwarded_for
        .and_then(|ip| HeaderValue::from_str(ip).ok())
    {
        headers.insert(HeaderName::from_static("x-forwarded-for"), ip.clone());
        headers.insert(HeaderName::from_static("x-real-ip"), ip);
    }

    headers
}
