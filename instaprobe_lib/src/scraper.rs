//! Top-level facade: validation, the profile cache, client IP registration
//! and the extraction pipeline.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use instaprobe_api::Client;
use serde::Serialize;

use crate::cache::MemoryCache;
use crate::config::{load_proxy_sources, ScraperConfig};
use crate::error::{ErrorKind, ScrapeError};
use crate::extract::ExtractionPipeline;
use crate::fetch::{CachedResponse, FetchOrchestrator, Origin};
use crate::profile::{count_data_points, ScrapedProfile};
use crate::proxy::{sources_from_config, ProxyPool};
use crate::validation::{normalize_client_ip, validate_username};

pub type ScrapeResult = Result<ScrapedProfile, ScrapeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionStatus {
    Operational,
    /// The site answered but the scrape failed.
    Degraded,
    /// The outbound path timed out or could not connect.
    Offline,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub status: ConnectionStatus,
    pub used_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_points: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct ProfileScraper {
    config: ScraperConfig,
    pool: Arc<ProxyPool>,
    responses: Arc<MemoryCache<CachedResponse>>,
    profiles: MemoryCache<ScrapedProfile>,
    fetcher: FetchOrchestrator,
    pipeline: ExtractionPipeline,
}

impl ProfileScraper {
    /// Scraper with the embedded proxy sources and the default strategies.
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let sources = match load_proxy_sources() {
            Ok(configs) => sources_from_config(&configs),
            Err(e) => {
                tracing::warn!("Proxy sources unavailable: {}", e);
                Vec::new()
            }
        };
        let pool = Arc::new(ProxyPool::with_sources(&config, sources));
        Self::with_components(config, pool, ExtractionPipeline::default())
    }

    pub fn from_env() -> Result<Self, ScrapeError> {
        Self::new(ScraperConfig::from_env())
    }

    pub fn with_components(
        config: ScraperConfig,
        pool: Arc<ProxyPool>,
        pipeline: ExtractionPipeline,
    ) -> Result<Self, ScrapeError> {
        let client = Client::with_options(&config.base_url, config.request_timeout)?;
        let responses = Arc::new(MemoryCache::new(config.cache_ttl, config.cache_capacity));
        let fetcher =
            FetchOrchestrator::new(client, Arc::clone(&pool), Arc::clone(&responses), &config);
        Ok(Self {
            profiles: MemoryCache::new(config.cache_ttl, config.profile_cache_capacity),
            config,
            pool,
            responses,
            fetcher,
            pipeline,
        })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }

    pub fn requests_sent(&self) -> u64 {
        self.fetcher.requests_sent()
    }

    /// Drops cached profiles and raw responses.
    pub fn clear_cache(&self) {
        self.profiles.clear();
        self.responses.clear();
    }

    /// Scrapes a public profile on behalf of `client_ip`.
    ///
    /// A repeat of the same (username, client IP) within the cache TTL returns
    /// the stored result with `cached = true` and makes no request.
    pub async fn scrape(
        &self,
        username: &str,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> ScrapeResult {
        self.scrape_with(username, client_ip, user_agent, true).await
    }

    async fn scrape_with(
        &self,
        username: &str,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
        use_profile_cache: bool,
    ) -> ScrapeResult {
        let started = Instant::now();
        let username = validate_username(username)?;
        let client_ip = normalize_client_ip(client_ip);
        let cache_key = format!(
            "profile:{}:{}",
            username,
            client_ip.as_deref().unwrap_or("direct")
        );

        if use_profile_cache {
            if let Some(mut hit) = self.profiles.get(&cache_key) {
                tracing::debug!("Profile cache hit for {}", cache_key);
                hit.cached = true;
                return Ok(hit);
            }
        }

        if let Some(ip) = client_ip.as_deref() {
            self.pool.add_user_ip(ip, user_agent);
        }
        let origin = Origin {
            client_ip,
            user_agent: user_agent.map(str::to_string),
        };

        let extraction = self.pipeline.run(&username, &origin, &self.fetcher).await?;
        let data_points = serde_json::to_value(&extraction.data)
            .map(|value| count_data_points(&value))
            .unwrap_or(0);

        let scraped = ScrapedProfile {
            profile: extraction.data.profile,
            posts: extraction.data.posts,
            used_ip: extraction.used_ip,
            extraction_time_ms: started.elapsed().as_millis() as u64,
            data_points,
            cached: false,
            strategy: extraction.strategy.to_string(),
            confidence: extraction.confidence,
        };
        self.profiles.set(cache_key, scraped.clone());
        Ok(scraped)
    }

    /// Scrapes the configured stable account, bypassing the profile cache.
    pub async fn test_connection(&self, client_ip: Option<&str>) -> ConnectionReport {
        let target = self.config.test_target.clone();
        match self.scrape_with(&target, client_ip, None, false).await {
            Ok(profile) => ConnectionReport {
                status: ConnectionStatus::Operational,
                used_ip: Some(profile.used_ip),
                data_points: Some(profile.data_points),
                message: None,
                timestamp: Utc::now(),
            },
            Err(e) => {
                let status = if e.root_kind().is_transport() {
                    ConnectionStatus::Offline
                } else {
                    ConnectionStatus::Degraded
                };
                tracing::warn!("Connection test {:?}: {}", status, e);
                ConnectionReport {
                    status,
                    used_ip: e.used_ip.clone(),
                    data_points: None,
                    message: Some(e.to_string()),
                    timestamp: Utc::now(),
                }
            }
        }
    }

    /// Stories need a logged-in session, which this scraper never has.
    pub async fn stories(&self, username: &str) -> Result<(), ScrapeError> {
        let username = validate_username(username)?;
        Err(ScrapeError::new(
            ErrorKind::AuthenticationRequired,
            format!("Stories for {} require authentication", username),
        ))
    }
}
