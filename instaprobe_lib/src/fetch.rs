//! Route selection, throttled sends, response caching and proxy feedback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use instaprobe_api::types::RawResponse;
use instaprobe_api::{Client, RequestKind, RequestOptions};
use rand::Rng;
use url::Url;

use crate::cache::MemoryCache;
use crate::config::ScraperConfig;
use crate::proxy::{ProxyCandidate, ProxyPool};

/// Who the request is made on behalf of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Origin {
    pub fn new(client_ip: Option<&str>, user_agent: Option<&str>) -> Self {
        Self {
            client_ip: client_ip.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
        }
    }

    /// Cache key component: the client IP or `direct`.
    pub fn cache_tag(&self) -> &str {
        self.client_ip.as_deref().unwrap_or("direct")
    }
}

/// How a request leaves the process.
#[derive(Debug, Clone)]
pub enum Route {
    /// Shared session annotated with forwarding headers for a registered client IP.
    OwnIp(String),
    PoolProxy(ProxyCandidate),
    Direct,
}

impl Route {
    /// Client IP, proxy `host:port`, or `direct`.
    pub fn used_ip(&self) -> String {
        match self {
            Route::OwnIp(ip) => ip.clone(),
            Route::PoolProxy(candidate) => candidate.key(),
            Route::Direct => "direct".to_string(),
        }
    }

    /// Identifier for performance feedback. Direct sends have none.
    fn feedback_id(&self) -> Option<String> {
        match self {
            Route::Direct => None,
            other => Some(other.used_ip()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::OwnIp(_) => "own-ip",
            Route::PoolProxy(_) => "pool-proxy",
            Route::Direct => "direct",
        }
    }
}

/// Raw transport result. Content is not interpreted here.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub route: Route,
    pub result: Result<RawResponse, instaprobe_api::Error>,
    pub cached: bool,
    pub latency: Duration,
}

impl FetchOutcome {
    pub fn used_ip(&self) -> String {
        self.route.used_ip()
    }
}

/// A successful response together with the route that carried it.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub response: RawResponse,
    pub route: Route,
}

/// Randomized pause before each send.
#[derive(Debug, Clone, Copy)]
pub struct RequestDelay {
    min: Duration,
    max: Duration,
}

impl RequestDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min > max {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max.is_zero() || self.min == self.max {
            return self.max;
        }
        Duration::from_secs_f64(
            rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64()),
        )
    }

    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Issues requests for the extraction strategies.
///
/// Each call picks a route (registered client IP, then best pool proxy, then
/// direct), consults the response cache, waits the randomized delay, sends,
/// and reports the outcome back to the pool. Cache hits skip route selection,
/// the delay and the feedback, and report the route that filled the entry.
pub struct FetchOrchestrator {
    client: Client,
    pool: Arc<ProxyPool>,
    cache: Arc<MemoryCache<CachedResponse>>,
    delay: RequestDelay,
    failure_latency: Duration,
    requests_sent: AtomicU64,
}

impl FetchOrchestrator {
    pub fn new(
        client: Client,
        pool: Arc<ProxyPool>,
        cache: Arc<MemoryCache<CachedResponse>>,
        config: &ScraperConfig,
    ) -> Self {
        Self {
            client,
            pool,
            cache,
            delay: RequestDelay::new(config.delay_min, config.delay_max),
            failure_latency: config.failure_latency,
            requests_sent: AtomicU64::new(0),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    pub fn select_route(&self, origin: &Origin) -> Route {
        if let Some(ip) = origin.client_ip.as_deref() {
            if self.pool.get_user_ip_proxy(ip).is_some() {
                return Route::OwnIp(ip.to_string());
            }
        }
        match self.pool.get_best_proxy() {
            Some(candidate) => Route::PoolProxy(candidate),
            None => Route::Direct,
        }
    }

    pub async fn fetch(
        &self,
        url: &Url,
        kind: RequestKind,
        origin: &Origin,
        use_cache: bool,
    ) -> FetchOutcome {
        let cache_key = format!("request:{}:{}", url, origin.cache_tag());

        if use_cache {
            if let Some(hit) = self.cache.get(&cache_key) {
                tracing::debug!("Cache hit for {} (via {})", cache_key, hit.route.used_ip());
                return FetchOutcome {
                    route: hit.route,
                    result: Ok(hit.response),
                    cached: true,
                    latency: Duration::ZERO,
                };
            }
        }

        let route = self.select_route(origin);
        self.delay.wait().await;

        let proxy_url = match &route {
            Route::PoolProxy(candidate) => Some(candidate.proxy_url()),
            _ => None,
        };
        let options = RequestOptions {
            kind,
            user_agent: origin.user_agent.as_deref(),
            proxy_url: proxy_url.as_deref(),
            forwarded_for: match &route {
                Route::OwnIp(ip) => Some(ip.as_str()),
                _ => None,
            },
        };

        tracing::debug!("GET {} via {} ({})", url, route.label(), route.used_ip());
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let result = self.client.get(url, &options).await;
        let elapsed = start.elapsed();

        let (success, latency) = match &result {
            Ok(resp) => {
                tracing::info!(
                    "GET {} -> {} in {}ms via {}",
                    url,
                    resp.status,
                    elapsed.as_millis(),
                    route.label()
                );
                (resp.is_ok(), elapsed)
            }
            Err(e) => {
                tracing::warn!("GET {} via {} failed: {}", url, route.label(), e);
                (false, self.failure_latency)
            }
        };

        if let Some(id) = route.feedback_id() {
            self.pool.update_proxy_performance(&id, success, latency);
        }

        if use_cache {
            if let Ok(resp) = &result {
                if resp.is_ok() {
                    self.cache.set(
                        cache_key,
                        CachedResponse {
                            response: resp.clone(),
                            route: route.clone(),
                        },
                    );
                }
            }
        }

        FetchOutcome {
            route,
            result,
            cached: false,
            latency,
        }
    }
}
