//! Proxy candidate pool: selection by score, outcome feedback, capacity-bounded
//! admission, refresh from external lists and connection verification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::candidate::{Protocol, ProxyAddr, ProxyCandidate};
use super::registry::UserIpRegistry;
use super::sources::ProxySource;
use crate::config::ScraperConfig;

/// Maximum concurrent verification probes.
const VERIFY_CONCURRENCY: usize = 16;

/// Read-only pool snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub pool_size: usize,
    pub user_ip_count: usize,
    /// Mean success rate over tested candidates, 0.0 when none are tested.
    pub avg_success_rate: f64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub tested_proxies: usize,
    pub best_score: Option<f64>,
    pub last_refresh_at: Option<DateTime<Utc>>,
}

pub struct ProxyPool {
    proxies: DashMap<String, ProxyCandidate>,
    user_ips: UserIpRegistry,
    sources: Vec<Box<dyn ProxySource>>,
    seq: AtomicU64,
    max_size: usize,
    latency_ceiling: Duration,
    failure_latency: Duration,
    refresh_timeout: Duration,
    verify_timeout: Duration,
    admit: Mutex<()>,
    refresh_lock: tokio::sync::Mutex<()>,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
}

impl ProxyPool {
    /// Pool with no external sources; `refresh_proxy_pool` is then a no-op.
    pub fn new(config: &ScraperConfig) -> Self {
        Self::with_sources(config, Vec::new())
    }

    pub fn with_sources(config: &ScraperConfig, sources: Vec<Box<dyn ProxySource>>) -> Self {
        Self {
            proxies: DashMap::new(),
            user_ips: UserIpRegistry::new(config.user_ip_ttl, config.max_user_ips),
            sources,
            seq: AtomicU64::new(0),
            max_size: config.max_pool_size.max(1),
            latency_ceiling: config.latency_ceiling,
            failure_latency: config.failure_latency,
            refresh_timeout: config.refresh_timeout,
            verify_timeout: config.verify_timeout,
            admit: Mutex::new(()),
            refresh_lock: tokio::sync::Mutex::new(()),
            last_refresh: Mutex::new(None),
        }
    }

    pub fn user_ips(&self) -> &UserIpRegistry {
        &self.user_ips
    }

    /// Highest-scoring pool candidate. Ties go to the most recently added.
    pub fn get_best_proxy(&self) -> Option<ProxyCandidate> {
        let ceiling = self.latency_ceiling;
        self.proxies
            .iter()
            .max_by(|a, b| {
                a.score(ceiling)
                    .total_cmp(&b.score(ceiling))
                    .then(a.added_seq.cmp(&b.added_seq))
            })
            .map(|entry| entry.value().clone())
    }

    pub fn get_user_ip_proxy(&self, ip: &str) -> Option<ProxyCandidate> {
        self.user_ips.candidate(ip)
    }

    pub fn add_user_ip(&self, ip: &str, user_agent: Option<&str>) {
        self.user_ips.register(ip, user_agent);
    }

    /// Records one outcome. `identifying_ip` is a registered client IP, a pool
    /// key (`host:port`) or a bare host. Unknown identifiers are ignored.
    pub fn update_proxy_performance(&self, identifying_ip: &str, success: bool, latency: Duration) {
        if self.user_ips.record(identifying_ip, success, latency) {
            return;
        }
        if let Some(mut candidate) = self.proxies.get_mut(identifying_ip) {
            candidate.stats.record(success, latency);
            return;
        }
        let by_host = self
            .proxies
            .iter()
            .filter(|entry| entry.address.host == identifying_ip)
            .min_by_key(|entry| entry.added_seq)
            .map(|entry| entry.key().clone());
        match by_host.and_then(|key| self.proxies.get_mut(&key)) {
            Some(mut candidate) => candidate.stats.record(success, latency),
            None => {
                tracing::debug!(
                    "Ignoring performance update for unknown address {}",
                    identifying_ip
                );
            }
        }
    }

    /// Admits a candidate. Returns `false` when the address is already pooled.
    pub fn add_proxy(&self, address: ProxyAddr, protocol: Protocol) -> bool {
        let key = address.to_string();
        if self.proxies.contains_key(&key) {
            return false;
        }

        let _guard = self.admit.lock().unwrap_or_else(|e| e.into_inner());
        if self.proxies.contains_key(&key) {
            return false;
        }
        while self.proxies.len() >= self.max_size {
            if !self.evict_worst() {
                break;
            }
        }
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.proxies
            .insert(key, ProxyCandidate::new(address, protocol, seq));
        true
    }

    fn evict_worst(&self) -> bool {
        let ceiling = self.latency_ceiling;
        let victim = self
            .proxies
            .iter()
            .min_by(|a, b| {
                a.score(ceiling)
                    .total_cmp(&b.score(ceiling))
                    .then(a.added_seq.cmp(&b.added_seq))
            })
            .map(|entry| entry.key().clone());
        match victim {
            Some(key) => {
                tracing::debug!("Evicting proxy {} (pool full)", key);
                self.proxies.remove(&key).is_some()
            }
            None => false,
        }
    }

    pub fn remove_proxy(&self, key: &str) -> Option<ProxyCandidate> {
        self.proxies.remove(key).map(|(_, candidate)| candidate)
    }

    pub fn get(&self, key: &str) -> Option<ProxyCandidate> {
        self.proxies.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Pulls every configured source and merges new unique addresses.
    ///
    /// Returns how many candidates were added. Source failures are logged and
    /// skipped; concurrent calls run one after another.
    pub async fn refresh_proxy_pool(&self) -> usize {
        let _running = self.refresh_lock.lock().await;

        let http = match reqwest::Client::builder()
            .timeout(self.refresh_timeout)
            .no_proxy()
            .build()
        {
            Ok(http) => http,
            Err(e) => {
                tracing::warn!("Cannot build refresh client: {}", e);
                return 0;
            }
        };

        let mut added = 0;
        for source in &self.sources {
            match source.fetch(&http).await {
                Ok(found) => {
                    let total = found.len();
                    let fresh = found
                        .into_iter()
                        .filter(|(addr, protocol)| self.add_proxy(addr.clone(), *protocol))
                        .count();
                    tracing::info!(
                        "Proxy source {}: {} listed, {} new",
                        source.name(),
                        total,
                        fresh
                    );
                    added += fresh;
                }
                Err(e) => {
                    tracing::warn!("Proxy source {} failed: {}", source.name(), e);
                }
            }
        }

        *self.last_refresh.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
        tracing::info!("Proxy refresh added {} candidates (pool size {})", added, self.len());
        added
    }

    /// Probes up to `limit` untested candidates with a GET to `judge_url`,
    /// newest first, and records each outcome. Returns how many answered
    /// with a success status.
    pub async fn verify_proxies(&self, judge_url: &str, limit: usize) -> usize {
        let mut untested: Vec<ProxyCandidate> = self
            .proxies
            .iter()
            .filter(|entry| !entry.stats.is_tested())
            .map(|entry| entry.value().clone())
            .collect();
        untested.sort_by(|a, b| b.added_seq.cmp(&a.added_seq));
        untested.truncate(limit);
        if untested.is_empty() {
            return 0;
        }

        let semaphore = Arc::new(Semaphore::new(VERIFY_CONCURRENCY));
        let mut join_set = JoinSet::new();
        for candidate in untested {
            let semaphore = Arc::clone(&semaphore);
            let judge_url = judge_url.to_string();
            let timeout = self.verify_timeout;
            let failure_latency = self.failure_latency;
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let (success, latency) =
                    probe(&candidate, &judge_url, timeout, failure_latency).await;
                (candidate.key(), success, latency)
            });
        }

        let mut working = 0;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((key, success, latency)) => {
                    if let Some(mut candidate) = self.proxies.get_mut(&key) {
                        candidate.stats.record(success, latency);
                    }
                    if success {
                        working += 1;
                    }
                }
                Err(e) => tracing::warn!("Verification task failed: {}", e),
            }
        }
        tracing::info!("Verified proxies: {} working", working);
        working
    }

    pub fn get_stats(&self) -> PoolStats {
        let ceiling = self.latency_ceiling;
        let mut total_successes = 0;
        let mut total_failures = 0;
        let mut tested = 0;
        let mut rate_sum = 0.0;
        let mut best_score: Option<f64> = None;
        for entry in self.proxies.iter() {
            total_successes += entry.stats.success_count;
            total_failures += entry.stats.failure_count;
            if entry.stats.is_tested() {
                tested += 1;
                rate_sum += entry.stats.success_rate();
            }
            let score = entry.score(ceiling);
            best_score = Some(best_score.map_or(score, |best| best.max(score)));
        }

        PoolStats {
            pool_size: self.proxies.len(),
            user_ip_count: self.user_ips.len(),
            avg_success_rate: if tested > 0 {
                rate_sum / tested as f64
            } else {
                0.0
            },
            total_successes,
            total_failures,
            tested_proxies: tested,
            best_score,
            last_refresh_at: *self.last_refresh.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }
}

async fn probe(
    candidate: &ProxyCandidate,
    judge_url: &str,
    timeout: Duration,
    failure_latency: Duration,
) -> (bool, Duration) {
    let proxy = match reqwest::Proxy::all(candidate.proxy_url()) {
        Ok(proxy) => proxy,
        Err(e) => {
            tracing::debug!("Cannot parse proxy {}: {}", candidate.key(), e);
            return (false, failure_latency);
        }
    };
    let client = match reqwest::Client::builder()
        .proxy(proxy)
        .timeout(timeout)
        .pool_max_idle_per_host(0)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::debug!("Cannot build verify client for {}: {}", candidate.key(), e);
            return (false, failure_latency);
        }
    };

    let start = Instant::now();
    match client.get(judge_url).send().await {
        Ok(resp) => (resp.status().is_success(), start.elapsed()),
        Err(e) => {
            tracing::debug!("Proxy {} failed verification: {}", candidate.key(), e);
            (false, failure_latency)
        }
    }
}
