//! Runtime configuration: scraper tunables from the environment and the
//! embedded proxy source list.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::proxy::Protocol;

/// Tunables for the fetch path, caches and proxy pool.
///
/// `Default` matches production behaviour. `from_env` lets every field be
/// overridden through an `INSTAPROBE_*` variable; unparseable values fall back
/// to the default.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    /// Per HTTP call.
    pub request_timeout: Duration,
    /// Lower bound of the randomized pre-request delay.
    pub delay_min: Duration,
    /// Upper bound of the randomized pre-request delay. Zero disables the delay.
    pub delay_max: Duration,
    pub cache_ttl: Duration,
    /// Raw response cache entries.
    pub cache_capacity: usize,
    /// Scraped profile cache entries.
    pub profile_cache_capacity: usize,
    /// Latency recorded for timeouts and connection errors.
    pub failure_latency: Duration,
    /// Latency at which the score penalty saturates.
    pub latency_ceiling: Duration,
    pub max_pool_size: usize,
    pub max_user_ips: usize,
    pub user_ip_ttl: Duration,
    pub refresh_timeout: Duration,
    pub verify_timeout: Duration,
    /// Account used by `test_connection`.
    pub test_target: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: instaprobe_api::DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            delay_min: Duration::from_millis(1000),
            delay_max: Duration::from_millis(2500),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 100,
            profile_cache_capacity: 100,
            failure_latency: Duration::from_secs(10),
            latency_ceiling: Duration::from_secs(10),
            max_pool_size: 500,
            max_user_ips: 1000,
            user_ip_ttl: Duration::from_secs(24 * 60 * 60),
            refresh_timeout: Duration::from_secs(10),
            verify_timeout: Duration::from_secs(5),
            test_target: "instagram".to_string(),
        }
    }
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: std::env::var("INSTAPROBE_BASE_URL").unwrap_or(d.base_url),
            request_timeout: env_secs("INSTAPROBE_REQUEST_TIMEOUT_SECS", d.request_timeout),
            delay_min: env_secs("INSTAPROBE_DELAY_MIN_SECS", d.delay_min),
            delay_max: env_secs("INSTAPROBE_DELAY_MAX_SECS", d.delay_max),
            cache_ttl: env_secs("INSTAPROBE_CACHE_TTL_SECS", d.cache_ttl),
            cache_capacity: env_usize("INSTAPROBE_CACHE_CAPACITY", d.cache_capacity),
            profile_cache_capacity: env_usize(
                "INSTAPROBE_PROFILE_CACHE_CAPACITY",
                d.profile_cache_capacity,
            ),
            failure_latency: env_secs("INSTAPROBE_FAILURE_LATENCY_SECS", d.failure_latency),
            latency_ceiling: env_secs("INSTAPROBE_LATENCY_CEILING_SECS", d.latency_ceiling),
            max_pool_size: env_usize("INSTAPROBE_MAX_POOL_SIZE", d.max_pool_size),
            max_user_ips: env_usize("INSTAPROBE_MAX_USER_IPS", d.max_user_ips),
            user_ip_ttl: env_secs("INSTAPROBE_USER_IP_TTL_SECS", d.user_ip_ttl),
            refresh_timeout: env_secs("INSTAPROBE_REFRESH_TIMEOUT_SECS", d.refresh_timeout),
            verify_timeout: env_secs("INSTAPROBE_VERIFY_TIMEOUT_SECS", d.verify_timeout),
            test_target: std::env::var("INSTAPROBE_TEST_TARGET").unwrap_or(d.test_target),
        }
    }

    /// Config for tests and local runs against a mock server: no throttle delay.
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(default)
}

/// Reads fractional seconds, e.g. `2.5`.
fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(default)
}

/// Error types for proxy source configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse proxy source YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error("Duplicate proxy source name: {0}")]
    DuplicateName(String),
}

/// How a source's body lists proxies.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// One `host:port` per line.
    PlainList,
    /// HTML page with addresses in table cells or inline `ip:port` text.
    HtmlListing,
}

/// A single external proxy list.
#[derive(Deserialize, Debug, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub format: SourceFormat,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Deserialize, Debug)]
struct SourceFile {
    sources: Vec<SourceConfig>,
}

/// Parse proxy sources from YAML content. Disabled entries are kept; callers filter.
pub fn parse_proxy_sources(yaml_content: &str) -> Result<Vec<SourceConfig>, ConfigError> {
    let file: SourceFile = serde_yml::from_str(yaml_content)?;

    let mut seen = std::collections::HashSet::new();
    for source in &file.sources {
        if !seen.insert(source.name.as_str()) {
            return Err(ConfigError::DuplicateName(source.name.clone()));
        }
    }

    Ok(file.sources)
}

/// Load the proxy sources embedded at compile time.
pub fn load_proxy_sources() -> Result<Vec<SourceConfig>, ConfigError> {
    let yaml_content = include_str!("../seed_data/proxy_sources.yml");
    parse_proxy_sources(yaml_content)
}
