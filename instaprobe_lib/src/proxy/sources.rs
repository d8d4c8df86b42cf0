//! External proxy lists consumed by `ProxyPool::refresh_proxy_pool`.

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use super::candidate::{Protocol, ProxyAddr};
use crate::config::{SourceConfig, SourceFormat};

/// Errors from a single proxy list fetch. Refresh logs these and moves on.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    HttpStatus(u16),
    #[error("parse error: {0}")]
    Parse(String),
}

/// A place to discover proxy candidates.
#[async_trait]
pub trait ProxySource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<(ProxyAddr, Protocol)>, SourceError>;
}

async fn fetch_body(http: &reqwest::Client, url: &str) -> Result<String, SourceError> {
    let resp = http
        .get(url)
        .header("user-agent", instaprobe_api::user_agent::get_user_agent())
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(SourceError::HttpStatus(resp.status().as_u16()));
    }
    Ok(resp.text().await?)
}

/// Text list with one `host:port` per line. Blank lines, comments and
/// malformed lines are skipped.
pub struct PlainListSource {
    name: String,
    url: String,
    protocol: Protocol,
}

impl PlainListSource {
    pub fn new(name: &str, url: &str, protocol: Protocol) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            protocol,
        }
    }
}

#[async_trait]
impl ProxySource for PlainListSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<(ProxyAddr, Protocol)>, SourceError> {
        let body = fetch_body(http, &self.url).await?;
        Ok(parse_plain_list(&body)
            .into_iter()
            .map(|addr| (addr, self.protocol))
            .collect())
    }
}

/// HTML page listing proxies, either as `ip:port` text or as adjacent
/// `<td>ip</td><td>port</td>` cells.
pub struct HtmlListingSource {
    name: String,
    url: String,
    protocol: Protocol,
}

impl HtmlListingSource {
    pub fn new(name: &str, url: &str, protocol: Protocol) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            protocol,
        }
    }
}

#[async_trait]
impl ProxySource for HtmlListingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<(ProxyAddr, Protocol)>, SourceError> {
        let body = fetch_body(http, &self.url).await?;
        Ok(parse_html_listing(&body)?
            .into_iter()
            .map(|addr| (addr, self.protocol))
            .collect())
    }
}

/// Builds the enabled sources from configuration.
pub fn sources_from_config(configs: &[SourceConfig]) -> Vec<Box<dyn ProxySource>> {
    configs
        .iter()
        .filter(|config| config.enabled)
        .map(|config| -> Box<dyn ProxySource> {
            match config.format {
                SourceFormat::PlainList => Box::new(PlainListSource::new(
                    &config.name,
                    &config.url,
                    config.protocol,
                )),
                SourceFormat::HtmlListing => Box::new(HtmlListingSource::new(
                    &config.name,
                    &config.url,
                    config.protocol,
                )),
            }
        })
        .collect()
}

pub fn parse_plain_list(body: &str) -> Vec<ProxyAddr> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.parse::<ProxyAddr>().ok())
        .collect()
}

pub fn parse_html_listing(html: &str) -> Result<Vec<ProxyAddr>, SourceError> {
    let re = Regex::new(
        r"(?P<ip>\d{1,3}(?:\.\d{1,3}){3})(?::|\s*</td>\s*<td[^>]*>\s*)(?P<port>\d{1,5})\b",
    )
    .map_err(|e| SourceError::Parse(format!("regex compile error: {}", e)))?;

    let mut seen = std::collections::HashSet::new();
    let mut proxies = Vec::new();
    for cap in re.captures_iter(html) {
        let ip = &cap["ip"];
        if ip.parse::<std::net::Ipv4Addr>().is_err() {
            continue;
        }
        let Ok(port) = cap["port"].parse::<u16>() else {
            continue;
        };
        if port == 0 {
            continue;
        }
        let addr = ProxyAddr::new(ip, port);
        if seen.insert(addr.to_string()) {
            proxies.push(addr);
        }
    }
    Ok(proxies)
}
